use crawl_core::{DetailRecord, ItemReference};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::extract::{resolve_url, text_of, SelectorExtractor};

/// Image attributes in priority order; lazy-loading attributes carry the real URL.
const IMAGE_ATTRIBUTES: [&str; 3] = ["data-original", "data-src", "src"];

pub(crate) fn extract_detail(
    extractor: &SelectorExtractor,
    html: &str,
    page_url: &str,
    reference: &ItemReference,
) -> DetailRecord {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let title = first_text(&document, &extractor.primary_title)
        .or_else(|| first_text(&document, &extractor.secondary_title))
        .or_else(|| first_text(&document, &extractor.document_title))
        .unwrap_or_else(|| reference.title.trim().to_string());

    DetailRecord {
        title,
        url: reference.url.clone(),
        image: extract_image(extractor, &document, base.as_ref()),
        stream_url: extract_stream_url(extractor, &document),
        error: None,
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(text_of)
        .find(|text| !text.is_empty())
}

fn extract_image(
    extractor: &SelectorExtractor,
    document: &Html,
    base: Option<&Url>,
) -> Option<String> {
    document.select(&extractor.image).find_map(|img| {
        IMAGE_ATTRIBUTES
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .and_then(|value| resolve_url(base, value))
    })
}

/// Play blocks in document order, then the whole page: player inputs often
/// sit outside the episode list.
fn extract_stream_url(extractor: &SelectorExtractor, document: &Html) -> String {
    document
        .select(&extractor.play_block)
        .chain(std::iter::once(document.root_element()))
        .find_map(|block| stream_in_block(extractor, block))
        .unwrap_or_default()
}

/// Tries, in order: an input value with the marker, an anchor href with the
/// marker, an anchor text with a `$`-separated value.
fn stream_in_block(extractor: &SelectorExtractor, block: ElementRef) -> Option<String> {
    let marker = extractor.stream_marker.as_str();

    let from_input = block
        .select(&extractor.input)
        .filter_map(|input| input.value().attr("value"))
        .map(str::trim)
        .filter(|value| value.contains(marker))
        .map(after_last_dollar)
        .find(|value| !value.is_empty());
    if from_input.is_some() {
        return from_input;
    }

    let from_href = block
        .select(&extractor.anchor)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .find(|href| href.contains(marker))
        .map(str::to_string);
    if from_href.is_some() {
        return from_href;
    }

    block
        .select(&extractor.anchor)
        .map(text_of)
        .filter(|text| text.contains('$'))
        .map(|text| after_last_dollar(&text))
        .find(|value| !value.is_empty())
}

/// Text after the last `$`, or the whole value when there is none.
fn after_last_dollar(value: &str) -> String {
    value.rsplit('$').next().unwrap_or(value).trim().to_string()
}
