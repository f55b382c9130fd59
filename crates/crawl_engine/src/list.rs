use crawl_core::ItemReference;
use scraper::{ElementRef, Html};
use url::Url;

use crate::extract::{resolve_url, text_of, SelectorExtractor};

pub(crate) fn extract_list_items(
    extractor: &SelectorExtractor,
    html: &str,
    page_url: &str,
) -> Vec<ItemReference> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&extractor.list_anchor)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            if !extractor.detail_link.is_match(href) {
                return None;
            }
            let title = find_title(extractor, anchor)?;
            let url = resolve_url(base.as_ref(), href)?;
            Some(ItemReference { title, url })
        })
        .collect()
}

/// Title inside the anchor first, then in the elements following it up to the
/// next anchor, which owns whatever comes after it.
fn find_title(extractor: &SelectorExtractor, anchor: ElementRef) -> Option<String> {
    let descendant = anchor
        .select(&extractor.list_title)
        .map(text_of)
        .find(|title| !title.is_empty());
    if descendant.is_some() {
        return descendant;
    }

    anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|sibling| sibling.value().name() != "a")
        .find_map(|sibling| {
            let title = if extractor.list_title.matches(&sibling) {
                Some(text_of(sibling))
            } else {
                sibling.select(&extractor.list_title).next().map(text_of)
            };
            title.filter(|title| !title.is_empty())
        })
}
