use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crawl_core::{
    update, DetailOutcome, DetailRecord, Effect, ItemReference, Manifest, Msg, Phase,
    PhaseEntry, PhaseState, PipelineState, PipelineSummary, Stage, WorkUnit,
};
use engine_logging::{engine_debug, engine_info, engine_warn};
use thiserror::Error;
use tokio::time::Instant;

use crate::persist::{ensure_output_dir, ArtifactStore, PersistError};
use crate::progress::{CrawlEvent, LogProgressSink, ProgressSink};
use crate::{ItemExtractor, PageFetcher, PhaseRunner};

/// Which listing pages to crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub base_url: String,
    pub listing_path: String,
    pub category_id: String,
    pub start_page: u32,
    pub end_page: u32,
}

impl CrawlTarget {
    /// `{base_url}{listing_path}/{category_id}/page/{page}.html`
    pub fn page_url(&self, page: u32) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.listing_path.trim_matches('/');
        if path.is_empty() {
            format!("{base}/{}/page/{page}.html", self.category_id)
        } else {
            format!("{base}/{path}/{}/page/{page}.html", self.category_id)
        }
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page
    }

    /// Stable identifier for the manifest; a different target never reuses artifacts.
    pub fn scope(&self) -> String {
        format!(
            "{}|{}|{}|{}-{}",
            self.base_url.trim_end_matches('/'),
            self.listing_path.trim_matches('/'),
            self.category_id,
            self.start_page,
            self.end_page
        )
    }
}

/// Random gap between listing page requests, drawn uniformly from `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPacing {
    pub min: Duration,
    pub max: Duration,
}

impl ListPacing {
    pub fn draw(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let spread = (self.max - self.min).as_millis().min(u64::MAX as u128) as u64;
        self.min + Duration::from_millis(fastrand::u64(0..=spread))
    }
}

/// Hands out request start times one pacing draw apart, so concurrent list
/// workers still reach the site one at a time.
struct PaceGate {
    pacing: ListPacing,
    next: Mutex<Option<Instant>>,
}

impl PaceGate {
    fn new(pacing: ListPacing) -> Self {
        Self {
            pacing,
            next: Mutex::new(None),
        }
    }

    async fn wait(&self) {
        let start = {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let start = next.map_or(now, |slot| slot.max(now));
            *next = Some(start + self.pacing.draw());
            start
        };
        tokio::time::sleep_until(start).await;
    }
}

#[derive(Clone)]
pub struct PipelineSettings {
    pub target: CrawlTarget,
    pub list_artifact: String,
    pub detail_artifact: String,
    pub list_workers: usize,
    pub detail_workers: usize,
    pub list_pacing: Option<ListPacing>,
    /// Timestamp source for manifest entries.
    pub completed_utc: Arc<dyn Fn() -> String + Send + Sync>,
}

impl PipelineSettings {
    pub fn new(target: CrawlTarget) -> Self {
        Self {
            target,
            list_artifact: "result.json".to_string(),
            detail_artifact: "detail_result.json".to_string(),
            list_workers: 10,
            detail_workers: 15,
            list_pacing: Some(ListPacing {
                min: Duration::from_millis(500),
                max: Duration::from_millis(1200),
            }),
            completed_utc: Arc::new(String::new),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("pipeline stopped at stage {0:?}")]
    Incomplete(Stage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub summary: PipelineSummary,
    /// Listing pages that could not be fetched in this run.
    pub pages_failed: usize,
    pub list_path: PathBuf,
    pub detail_path: PathBuf,
}

struct PageOutcome {
    page: u32,
    items: Vec<ItemReference>,
    error: Option<String>,
}

struct RunContext {
    manifest: Manifest,
    pages_failed: usize,
}

/// List phase -> dedup -> detail phase, each skipped when the manifest shows
/// it already completed.
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ItemExtractor>,
    store: ArtifactStore,
    settings: PipelineSettings,
    sink: Arc<dyn ProgressSink>,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ItemExtractor>,
        store: ArtifactStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            settings,
            sink: Arc::new(LogProgressSink),
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        ensure_output_dir(self.store.dir())?;

        let mut ctx = RunContext {
            manifest: self.store.load_manifest(),
            pages_failed: 0,
        };
        let mut state = PipelineState::new();
        let mut inbox = VecDeque::from([Msg::Start]);

        while let Some(msg) = inbox.pop_front() {
            let (next, effects) = update(state, msg);
            state = next;
            for effect in effects {
                if let Some(msg) = self.execute(effect, &mut ctx).await? {
                    inbox.push_back(msg);
                }
            }
        }

        if state.stage() != Stage::Done {
            return Err(PipelineError::Incomplete(state.stage()));
        }

        Ok(PipelineReport {
            summary: state.summary(),
            pages_failed: ctx.pages_failed,
            list_path: self.store.path_of(&self.settings.list_artifact),
            detail_path: self.store.path_of(&self.settings.detail_artifact),
        })
    }

    async fn execute(
        &self,
        effect: Effect,
        ctx: &mut RunContext,
    ) -> Result<Option<Msg>, PipelineError> {
        let msg = match effect {
            Effect::CheckListPhase => Msg::ListPhaseChecked(self.check_list(&ctx.manifest)?),
            Effect::LoadList => {
                let items: Vec<ItemReference> =
                    self.store.read_json(&self.settings.list_artifact)?;
                engine_info!(
                    "Loaded {} list entries from {:?}",
                    items.len(),
                    self.store.path_of(&self.settings.list_artifact)
                );
                Msg::ListLoaded(items)
            }
            Effect::CrawlList => {
                let (items, pages_failed) = self.crawl_list().await;
                ctx.pages_failed = pages_failed;
                self.persist_phase(Phase::List, &self.settings.list_artifact, &items, ctx)?;
                Msg::ListCrawled(items)
            }
            Effect::CheckDetailPhase { item_count } => {
                Msg::DetailPhaseChecked(self.check_detail(&ctx.manifest, item_count)?)
            }
            Effect::CrawlDetail { items } => {
                let records = self.crawl_detail(items).await;
                let failed = records.iter().filter(|record| record.is_failed()).count();
                let succeeded = records.len() - failed;
                self.persist_phase(Phase::Detail, &self.settings.detail_artifact, &records, ctx)?;
                self.sink.emit(CrawlEvent::PhaseFinished {
                    phase: Phase::Detail,
                    succeeded,
                    failed,
                });
                Msg::DetailCrawled { succeeded, failed }
            }
            Effect::Finish => return Ok(None),
        };
        Ok(Some(msg))
    }

    fn recorded_digest(
        &self,
        manifest: &Manifest,
        phase: Phase,
        artifact: &str,
    ) -> Result<Option<String>, PipelineError> {
        match manifest.entry(phase) {
            Some(entry) if entry.artifact == artifact => Ok(self.store.digest_of(artifact)?),
            _ => Ok(None),
        }
    }

    fn check_list(&self, manifest: &Manifest) -> Result<PhaseState, PipelineError> {
        let digest = self.recorded_digest(manifest, Phase::List, &self.settings.list_artifact)?;
        let state = manifest.list_state(&self.settings.target.scope(), digest.as_deref());
        if state == PhaseState::Complete {
            let count = manifest.entry(Phase::List).map_or(0, |entry| entry.count);
            self.sink.emit(CrawlEvent::PhaseSkipped {
                phase: Phase::List,
                count,
            });
        } else if manifest.entry(Phase::List).is_some() {
            engine_info!("List artifact is stale or was changed, crawling again");
        }
        Ok(state)
    }

    fn check_detail(
        &self,
        manifest: &Manifest,
        item_count: usize,
    ) -> Result<PhaseState, PipelineError> {
        let digest =
            self.recorded_digest(manifest, Phase::Detail, &self.settings.detail_artifact)?;
        let state = manifest.detail_state(
            &self.settings.target.scope(),
            item_count,
            digest.as_deref(),
        );
        if state == PhaseState::Complete {
            let count = manifest.entry(Phase::Detail).map_or(0, |entry| entry.count);
            self.sink.emit(CrawlEvent::PhaseSkipped {
                phase: Phase::Detail,
                count,
            });
        }
        Ok(state)
    }

    /// Writes the artifact first and the manifest second, so a crash in
    /// between leaves the phase looking unfinished.
    fn persist_phase<T: serde::Serialize>(
        &self,
        phase: Phase,
        artifact: &str,
        entries: &[T],
        ctx: &mut RunContext,
    ) -> Result<(), PipelineError> {
        let written = self.store.write_json(artifact, entries)?;
        ctx.manifest.record(
            phase,
            PhaseEntry {
                artifact: artifact.to_string(),
                count: entries.len(),
                sha256: written.sha256,
                scope: self.settings.target.scope(),
                completed_utc: (self.settings.completed_utc)(),
            },
        );
        self.store.save_manifest(&ctx.manifest)?;
        engine_info!(
            "{} phase saved {} entries to {:?}",
            phase,
            entries.len(),
            written.path
        );
        Ok(())
    }

    async fn crawl_list(&self) -> (Vec<ItemReference>, usize) {
        let target = &self.settings.target;
        engine_info!(
            "Crawling listing pages {}-{} of category {}",
            target.start_page,
            target.end_page,
            target.category_id
        );

        let runner = PhaseRunner::new(self.settings.list_workers);
        let units = WorkUnit::sequence(target.pages());
        let gate = self.settings.list_pacing.map(PaceGate::new);
        let pages = runner
            .run_observed(
                units,
                |unit| self.fetch_list_page(*unit.payload(), gate.as_ref()),
                |_, outcome: &PageOutcome| {
                    self.sink.emit(CrawlEvent::PageCompleted {
                        page: outcome.page,
                        items: outcome.items.len(),
                        error: outcome.error.clone(),
                    })
                },
            )
            .await;

        let pages_failed = pages.iter().filter(|page| page.error.is_some()).count();
        let items: Vec<ItemReference> = pages.into_iter().flat_map(|page| page.items).collect();
        self.sink.emit(CrawlEvent::PhaseFinished {
            phase: Phase::List,
            succeeded: items.len(),
            failed: pages_failed,
        });
        if items.is_empty() {
            engine_warn!("No items found on listing pages of {}", target.base_url);
        }
        (items, pages_failed)
    }

    async fn fetch_list_page(&self, page: u32, gate: Option<&PaceGate>) -> PageOutcome {
        if let Some(gate) = gate {
            gate.wait().await;
        }
        let url = self.settings.target.page_url(page);
        engine_debug!("GET {}", url);
        match self.fetcher.fetch(&url).await {
            Ok(fetched) => PageOutcome {
                page,
                items: self
                    .extractor
                    .extract_list_items(&fetched.html, &fetched.final_url),
                error: None,
            },
            Err(err) => PageOutcome {
                page,
                items: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }

    async fn crawl_detail(&self, items: Vec<ItemReference>) -> Vec<DetailRecord> {
        let total = items.len();
        engine_info!(
            "Crawling {} detail pages with {} workers",
            total,
            self.settings.detail_workers
        );

        let runner = PhaseRunner::new(self.settings.detail_workers);
        let outcomes = runner
            .run_observed(
                WorkUnit::sequence(items),
                |unit| self.fetch_detail(unit.into_payload()),
                |position, outcome: &DetailOutcome| {
                    let error = match outcome {
                        DetailOutcome::Failed { reason, .. } => Some(reason.clone()),
                        DetailOutcome::Extracted(_) => None,
                    };
                    self.sink.emit(CrawlEvent::ItemCompleted {
                        position: position + 1,
                        total,
                        url: outcome.url().to_string(),
                        title: outcome.title().to_string(),
                        error,
                    })
                },
            )
            .await;

        outcomes
            .into_iter()
            .map(DetailOutcome::into_record)
            .collect()
    }

    async fn fetch_detail(&self, reference: ItemReference) -> DetailOutcome {
        engine_debug!("GET {}", reference.url);
        match self.fetcher.fetch(&reference.url).await {
            Ok(page) => DetailOutcome::Extracted(self.extractor.extract_detail(
                &page.html,
                &page.final_url,
                &reference,
            )),
            Err(err) => DetailOutcome::Failed {
                reference,
                reason: err.to_string(),
            },
        }
    }
}
