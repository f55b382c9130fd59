use std::collections::HashSet;

use crate::ItemReference;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deduped {
    pub items: Vec<ItemReference>,
    pub removed: usize,
}

/// Drop references whose `url` was already seen. The first occurrence wins,
/// title included, and the relative order of survivors is unchanged.
pub fn dedup_by_url(items: Vec<ItemReference>) -> Deduped {
    let mut seen = HashSet::with_capacity(items.len());
    let total = items.len();
    let items: Vec<ItemReference> = items
        .into_iter()
        .filter(|item| seen.insert(item.url.clone()))
        .collect();
    Deduped {
        removed: total - items.len(),
        items,
    }
}
