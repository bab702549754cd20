use crate::UrlError;
use url::Url;

/// Normalizes a seed URL into the form used as its stored identity
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Parse the URL; reject if malformed
/// 3. Require an `http` or `https` scheme
/// 4. Require a host (the `url` crate lowercases it)
/// 5. Remove the fragment
///
/// Paths get their dot segments resolved and an empty path becomes `/`
/// as part of parsing, so `http://A.com` and `http://a.com/` share an identity.
///
/// # Examples
///
/// ```
/// use hostwatch::url::normalize_seed;
///
/// let url = normalize_seed("  http://Example.COM#top ").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/");
/// ```
pub fn normalize_seed(raw: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url)
}
