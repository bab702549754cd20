use url::Url;

/// Prefix removed from hosts so `www.example.com` and `example.com` count together
const WWW_PREFIX: &str = "www.";

/// Derives the normalized domain of a link
///
/// The link must carry an explicit authority (`scheme://host...` or the
/// scheme-relative `//host...`); anything else has no network location and
/// yields an empty string. The host is taken without port or credentials and
/// a single leading `www.` is removed.
///
/// Malformed links are not an error here: an empty domain marks the link as
/// incomplete and it is dropped before aggregation.
///
/// # Examples
///
/// ```
/// use hostwatch::url::domain_of;
///
/// assert_eq!(domain_of("http://www.vk.com"), "vk.com");
/// assert_eq!(domain_of("http://vk.com"), "vk.com");
/// assert_eq!(domain_of("http:/ww.vk.com"), "");
/// assert_eq!(domain_of("vk.com"), "");
/// ```
pub fn domain_of(link: &str) -> String {
    let link = link.trim();

    let parsed = if link.starts_with("//") {
        Url::parse(&format!("http:{}", link))
    } else if has_authority(link) {
        Url::parse(link)
    } else {
        return String::new();
    };

    let host = match parsed.ok().as_ref().and_then(Url::host_str) {
        Some(host) => host.to_lowercase(),
        None => return String::new(),
    };

    match host.strip_prefix(WWW_PREFIX) {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Returns true if `link` looks like `scheme://...`
fn has_authority(link: &str) -> bool {
    match link.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().map_or(false, |c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
