#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckListPhase,
    LoadList,
    CrawlList,
    CheckDetailPhase { item_count: usize },
    CrawlDetail { items: Vec<crate::ItemReference> },
    Finish,
}
