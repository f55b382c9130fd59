//! Crawl engine: fetching, extraction, the phase runner and the two-phase pipeline.
mod decode;
mod detail;
mod extract;
mod fetch;
mod list;
mod persist;
mod pipeline;
mod progress;
mod runner;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use extract::{ExtractorError, ExtractorSelectors, ItemExtractor, SelectorExtractor};
pub use fetch::{FetchSettings, PageFetcher, ReqwestFetcher, RetryPolicy, DEFAULT_USER_AGENTS};
pub use persist::{
    ensure_output_dir, ArtifactStore, AtomicFileWriter, PersistError, WrittenArtifact,
    MANIFEST_FILENAME,
};
pub use pipeline::{
    CrawlTarget, ListPacing, Pipeline, PipelineError, PipelineReport, PipelineSettings,
};
pub use progress::{CrawlEvent, LogProgressSink, ProgressSink};
pub use runner::PhaseRunner;
pub use types::{FailureKind, FetchError, FetchedPage};
