//! HTML link extraction
//!
//! Extraction sits behind the [`LinkExtractor`] trait so the markup parser can
//! be swapped (by configuration or in tests) without touching the pipeline.
//! Both built-in variants use `scraper`.
//!
//! Extraction never fails: malformed markup or a body that isn't HTML at all
//! simply yields no links.

use crate::config::ParserKind;
use scraper::{Html, Selector};

/// Single-pass sequence of raw `href` values
pub type Links = Box<dyn Iterator<Item = String> + Send>;

/// Something that can pull hyperlink targets out of a fetched body
pub trait LinkExtractor: Send + Sync {
    /// Yields the raw `href` of every anchor element carrying one
    fn extract(&self, body: &str) -> Links;
}

/// Extractor that parses the body as a full HTML document
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, body: &str) -> Links {
        anchor_hrefs(&Html::parse_document(body))
    }
}

/// Extractor that parses the body as an HTML fragment
///
/// Useful for bodies that are snippets rather than whole documents; no
/// implicit `<html>`/`<body>` structure is assumed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FragmentLinkExtractor;

impl LinkExtractor for FragmentLinkExtractor {
    fn extract(&self, body: &str) -> Links {
        anchor_hrefs(&Html::parse_fragment(body))
    }
}

/// Returns the extractor for the configured parser variant
pub fn extractor_for(kind: ParserKind) -> Box<dyn LinkExtractor> {
    match kind {
        ParserKind::Html => Box::new(HtmlLinkExtractor),
        ParserKind::Fragment => Box::new(FragmentLinkExtractor),
    }
}

/// Collects `href` values from `<a href>` elements
///
/// The parsed tree is not `Send`, so the values are gathered before the
/// iterator is handed back. Empty and whitespace-only targets are skipped.
///
/// Anchors are read from the tree the parser builds, not from the source
/// text. A misnested `<a>` that the parser reopens is seen once per copy.
fn anchor_hrefs(document: &Html) -> Links {
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Box::new(std::iter::empty()),
    };

    let hrefs: Vec<String> = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect();

    Box::new(hrefs.into_iter())
}
