use crawl_core::{dedup_by_url, ItemReference};
use pretty_assertions::assert_eq;

fn item(title: &str, id: u32) -> ItemReference {
    ItemReference::new(title, format!("https://example.com/detail/id/{id}.html"))
}

#[test]
fn keeps_first_title_for_each_url() {
    let deduped = dedup_by_url(vec![
        item("first", 1),
        item("second", 2),
        item("first again", 1),
        item("third", 3),
        item("second again", 2),
    ]);

    assert_eq!(
        deduped.items,
        vec![item("first", 1), item("second", 2), item("third", 3)]
    );
    assert_eq!(deduped.removed, 2);
}

#[test]
fn each_url_survives_exactly_once() {
    let raw: Vec<_> = (0..50).map(|n| item(&format!("t{n}"), n % 7)).collect();
    let deduped = dedup_by_url(raw);

    assert_eq!(deduped.items.len(), 7);
    let mut urls: Vec<_> = deduped.items.iter().map(|i| i.url.clone()).collect();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), 7);
    assert_eq!(deduped.items[0].title, "t0");
    assert_eq!(deduped.items[6].title, "t6");
}

#[test]
fn empty_input_is_fine() {
    let deduped = dedup_by_url(Vec::new());
    assert!(deduped.items.is_empty());
    assert_eq!(deduped.removed, 0);
}
