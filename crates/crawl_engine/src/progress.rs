use crawl_core::Phase;
use engine_logging::{engine_info, engine_warn};

const TITLE_PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    PageCompleted {
        page: u32,
        items: usize,
        error: Option<String>,
    },
    ItemCompleted {
        /// 1-based position among the deduplicated items.
        position: usize,
        total: usize,
        url: String,
        title: String,
        error: Option<String>,
    },
    PhaseSkipped {
        phase: Phase,
        count: usize,
    },
    PhaseFinished {
        phase: Phase,
        succeeded: usize,
        failed: usize,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

/// Writes one log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::PageCompleted {
                page,
                items: 0,
                error: None,
            } => engine_warn!("page {} -> no items", page),
            CrawlEvent::PageCompleted {
                page,
                items,
                error: None,
            } => engine_info!("page {} -> {} items", page, items),
            CrawlEvent::PageCompleted {
                page,
                error: Some(err),
                ..
            } => engine_warn!("page {} failed: {}", page, err),
            CrawlEvent::ItemCompleted {
                position,
                total,
                url,
                title,
                error,
            } => {
                let status = if error.is_none() { "ok" } else { "failed" };
                engine_info!(
                    "[{:>15}] {} ({}/{}) {}",
                    url_tail(&url),
                    status,
                    position,
                    total,
                    preview(&title)
                );
                if let Some(err) = error {
                    engine_warn!("{} failed: {}", url, err);
                }
            }
            CrawlEvent::PhaseSkipped { phase, count } => {
                engine_info!("{} phase already complete ({} entries), skipping", phase, count)
            }
            CrawlEvent::PhaseFinished {
                phase,
                succeeded,
                failed,
            } => engine_info!(
                "{} phase finished: {} ok, {} failed",
                phase,
                succeeded,
                failed
            ),
        }
    }
}

fn url_tail(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

fn preview(title: &str) -> String {
    title.chars().take(TITLE_PREVIEW_CHARS).collect()
}
