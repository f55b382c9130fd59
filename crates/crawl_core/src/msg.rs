#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Kick off a run.
    Start,
    /// Outcome of inspecting the manifest for the list phase.
    ListPhaseChecked(crate::PhaseState),
    /// References read back from a complete list artifact.
    ListLoaded(Vec<crate::ItemReference>),
    /// References produced by crawling the listing pages (already persisted).
    ListCrawled(Vec<crate::ItemReference>),
    /// Outcome of inspecting the manifest for the detail phase.
    DetailPhaseChecked(crate::PhaseState),
    /// Detail records were collected and persisted.
    DetailCrawled { succeeded: usize, failed: usize },
    NoOp,
}
