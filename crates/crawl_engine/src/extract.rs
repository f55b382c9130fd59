use crawl_core::{DetailRecord, ItemReference};
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{detail, list};

/// Turns fetched pages into references and records.
///
/// Implementations never fail: a missing element is a fallback or an empty
/// field, not an error.
pub trait ItemExtractor: Send + Sync {
    /// Item references on one listing page, in document order.
    fn extract_list_items(&self, html: &str, page_url: &str) -> Vec<ItemReference>;

    /// Detail record for `reference`; `page_url` is used to resolve relative links.
    fn extract_detail(&self, html: &str, page_url: &str, reference: &ItemReference)
        -> DetailRecord;
}

/// CSS selectors and patterns for one site layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSelectors {
    /// Candidate anchors on listing pages.
    pub list_anchor: String,
    /// Regex an anchor's `href` must match to count as a detail link.
    pub detail_link_pattern: String,
    /// Title element, searched inside the anchor and then among its siblings.
    pub list_title: String,
    pub image: String,
    pub primary_title: String,
    pub secondary_title: String,
    /// Blocks holding play links; the whole page is scanned when none match.
    pub play_block: String,
    /// Substring identifying a stream file URL.
    pub stream_marker: String,
}

impl Default for ExtractorSelectors {
    fn default() -> Self {
        Self {
            list_anchor: "a.row[href]".to_string(),
            detail_link_pattern: r"/detail/id/\d+".to_string(),
            list_title: r#"li[style*="text-align"], .title"#.to_string(),
            image: "img#detail-img, .detail-pic img, .vod-pic img".to_string(),
            primary_title: "h1.limit".to_string(),
            secondary_title: ".detail-info h2, .vod-info .title, h2.title".to_string(),
            play_block: ".play-info, .playlist, .stui-content__playlist".to_string(),
            stream_marker: ".m3u8".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractorError {
    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("invalid detail link pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// [`ItemExtractor`] driven by [`ExtractorSelectors`], compiled once up front.
#[derive(Debug)]
pub struct SelectorExtractor {
    pub(crate) list_anchor: Selector,
    pub(crate) detail_link: Regex,
    pub(crate) list_title: Selector,
    pub(crate) image: Selector,
    pub(crate) primary_title: Selector,
    pub(crate) secondary_title: Selector,
    pub(crate) document_title: Selector,
    pub(crate) play_block: Selector,
    pub(crate) input: Selector,
    pub(crate) anchor: Selector,
    pub(crate) stream_marker: String,
}

impl SelectorExtractor {
    pub fn new(selectors: &ExtractorSelectors) -> Result<Self, ExtractorError> {
        let detail_link = Regex::new(&selectors.detail_link_pattern).map_err(|err| {
            ExtractorError::InvalidPattern {
                pattern: selectors.detail_link_pattern.clone(),
                message: err.to_string(),
            }
        })?;

        Ok(Self {
            list_anchor: parse_selector(&selectors.list_anchor)?,
            detail_link,
            list_title: parse_selector(&selectors.list_title)?,
            image: parse_selector(&selectors.image)?,
            primary_title: parse_selector(&selectors.primary_title)?,
            secondary_title: parse_selector(&selectors.secondary_title)?,
            document_title: parse_selector("title")?,
            play_block: parse_selector(&selectors.play_block)?,
            input: parse_selector("input")?,
            anchor: parse_selector("a")?,
            stream_marker: selectors.stream_marker.clone(),
        })
    }
}

impl ItemExtractor for SelectorExtractor {
    fn extract_list_items(&self, html: &str, page_url: &str) -> Vec<ItemReference> {
        list::extract_list_items(self, html, page_url)
    }

    fn extract_detail(
        &self,
        html: &str,
        page_url: &str,
        reference: &ItemReference,
    ) -> DetailRecord {
        detail::extract_detail(self, html, page_url, reference)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractorError> {
    Selector::parse(selector).map_err(|err| ExtractorError::InvalidSelector {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}

/// Concatenated, trimmed text content of an element.
pub(crate) fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Resolve `link` against `base`; absolute links pass through unchanged.
pub(crate) fn resolve_url(base: Option<&Url>, link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    match base {
        Some(base) => base.join(link).ok().map(String::from),
        None => Url::parse(link)
            .ok()
            .map(String::from)
            .or_else(|| Some(link.to_string())),
    }
}
