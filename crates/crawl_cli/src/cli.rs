use std::path::PathBuf;

use clap::Parser;
use engine_logging::{LogDestination, DEFAULT_LOG_FILE};
use log::LevelFilter;

use crate::config::{ConfigError, CrawlConfig};

/// Crawl paginated listing pages, then every item's detail page.
///
/// Finished phases are recorded in `manifest.json` inside the output
/// directory; running again with the same target only redoes what is missing.
#[derive(Debug, Parser)]
#[command(name = "crawl", version, about)]
pub struct Args {
    /// RON file with a `CrawlConfig`; flags below override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Site root, e.g. https://example.com
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub start_page: Option<u32>,
    #[arg(long)]
    pub end_page: Option<u32>,
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Concurrent detail page fetches.
    #[arg(short, long)]
    pub workers: Option<usize>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Retries after the first attempt of each request.
    #[arg(long)]
    pub retries: Option<u32>,
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Log to the file only.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn log_destination(&self) -> LogDestination {
        if self.quiet {
            LogDestination::File(self.log_file.clone())
        } else {
            LogDestination::Both(self.log_file.clone())
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    /// Config file (or defaults), flag overrides, then validation.
    pub fn resolve_config(&self) -> Result<CrawlConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => CrawlConfig::load(path)?,
            None => CrawlConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut CrawlConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(category) = &self.category {
            config.category_id = category.clone();
        }
        if let Some(start) = self.start_page {
            config.start_page = start;
        }
        if let Some(end) = self.end_page {
            config.end_page = end;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.retry_count = retries;
        }
    }
}
