use crate::{dedup_by_url, ItemReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    CheckingList,
    LoadingList,
    CrawlingList,
    CheckingDetail,
    CrawlingDetail,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    /// Taken from a complete artifact of an earlier run.
    Loaded,
    Crawled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailResult {
    Skipped,
    Crawled { succeeded: usize, failed: usize },
}

/// Snapshot of a pipeline run, suitable for the final report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    pub stage: Stage,
    pub list_source: Option<ListSource>,
    pub raw_items: usize,
    pub duplicates_removed: usize,
    pub items: usize,
    pub detail: Option<DetailResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineState {
    stage: Stage,
    items: Vec<ItemReference>,
    list_source: Option<ListSource>,
    raw_items: usize,
    duplicates_removed: usize,
    detail: Option<DetailResult>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Deduplicated references, in first-seen order.
    pub fn items(&self) -> &[ItemReference] {
        &self.items
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            stage: self.stage,
            list_source: self.list_source,
            raw_items: self.raw_items,
            duplicates_removed: self.duplicates_removed,
            items: self.items.len(),
            detail: self.detail,
        }
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub(crate) fn accept_list(&mut self, raw: Vec<ItemReference>, source: ListSource) {
        self.raw_items = raw.len();
        let deduped = dedup_by_url(raw);
        self.duplicates_removed = deduped.removed;
        self.items = deduped.items;
        self.list_source = Some(source);
    }

    pub(crate) fn set_detail(&mut self, detail: DetailResult) {
        self.detail = Some(detail);
    }
}
