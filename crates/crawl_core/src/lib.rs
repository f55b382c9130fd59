//! Crawl core: data model, dedup, phase manifest and the pure pipeline state machine.
mod dedup;
mod effect;
mod manifest;
mod msg;
mod state;
mod types;
mod update;

pub use dedup::{dedup_by_url, Deduped};
pub use effect::Effect;
pub use manifest::{sha256_hex, Manifest, Phase, PhaseEntry, PhaseState};
pub use msg::Msg;
pub use state::{DetailResult, ListSource, PipelineState, PipelineSummary, Stage};
pub use types::{DetailOutcome, DetailRecord, ItemReference, WorkUnit, FAILURE_MARKER};
pub use update::update;
