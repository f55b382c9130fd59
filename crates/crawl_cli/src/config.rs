use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crawl_engine::{
    CrawlTarget, ExtractorSelectors, FetchSettings, ListPacing, PipelineSettings, RetryPolicy,
    DEFAULT_USER_AGENTS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("base_url {0:?} is not an absolute http(s) URL")]
    BaseUrl(String),
    #[error("page range {start}..={end} is empty or starts at zero")]
    PageRange { start: u32, end: u32 },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("list delay minimum {min}ms exceeds maximum {max}ms")]
    Delay { min: u64, max: u64 },
    #[error("user agent pool is empty")]
    NoUserAgents,
}

/// Everything one crawl run needs, as read from a RON file and the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub base_url: String,
    pub listing_path: String,
    pub category_id: String,
    pub start_page: u32,
    pub end_page: u32,
    pub output_dir: PathBuf,
    pub list_artifact: String,
    pub detail_artifact: String,
    /// Concurrent detail page fetches.
    pub max_workers: usize,
    /// Concurrent listing page fetches.
    pub list_workers: usize,
    pub request_timeout_secs: u64,
    /// Retries after the first attempt.
    pub retry_count: u32,
    /// `(min, max)` pause before each listing page, in milliseconds.
    pub list_delay_ms: (u64, u64),
    pub user_agents: Vec<String>,
    pub selectors: ExtractorSelectors,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            listing_path: "/index.php/vod/type/id".to_string(),
            category_id: "63".to_string(),
            start_page: 1,
            end_page: 2,
            output_dir: PathBuf::from("test/output"),
            list_artifact: "result.json".to_string(),
            detail_artifact: "detail_result.json".to_string(),
            max_workers: 15,
            list_workers: 10,
            request_timeout_secs: 20,
            retry_count: 3,
            list_delay_ms: (500, 1200),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            selectors: ExtractorSelectors::default(),
        }
    }
}

impl CrawlConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => return Err(ConfigError::BaseUrl(self.base_url.clone())),
        }
        if self.start_page == 0 || self.start_page > self.end_page {
            return Err(ConfigError::PageRange {
                start: self.start_page,
                end: self.end_page,
            });
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Zero("max_workers"));
        }
        if self.list_workers == 0 {
            return Err(ConfigError::Zero("list_workers"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        let (min, max) = self.list_delay_ms;
        if min > max {
            return Err(ConfigError::Delay { min, max });
        }
        if self.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::NoUserAgents);
        }
        Ok(())
    }

    pub fn target(&self) -> CrawlTarget {
        CrawlTarget {
            base_url: self.base_url.clone(),
            listing_path: self.listing_path.clone(),
            category_id: self.category_id.clone(),
            start_page: self.start_page,
            end_page: self.end_page,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            pool_size: self.max_workers.max(self.list_workers) * 2,
            user_agents: self
                .user_agents
                .iter()
                .map(|ua| ua.trim())
                .filter(|ua| !ua.is_empty())
                .map(str::to_string)
                .collect(),
            retry: RetryPolicy {
                retries: self.retry_count,
                ..RetryPolicy::default()
            },
            ..FetchSettings::default()
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        let (min, max) = self.list_delay_ms;
        let list_pacing = (max > 0).then(|| ListPacing {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        });
        PipelineSettings {
            list_artifact: self.list_artifact.clone(),
            detail_artifact: self.detail_artifact.clone(),
            list_workers: self.list_workers,
            detail_workers: self.max_workers,
            list_pacing,
            completed_utc: Arc::new(|| Utc::now().to_rfc3339()),
            ..PipelineSettings::new(self.target())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CrawlConfig {
        CrawlConfig {
            base_url: "https://example.com".to_string(),
            ..CrawlConfig::default()
        }
    }

    #[test]
    fn defaults_need_only_a_base_url() {
        assert!(matches!(
            CrawlConfig::default().validate(),
            Err(ConfigError::BaseUrl(_))
        ));
        valid().validate().expect("valid");
    }

    #[test]
    fn partial_ron_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.ron");
        fs::write(
            &path,
            r#"(
                base_url: "https://example.com",
                category_id: "20",
                end_page: 5,
                list_delay_ms: (0, 0),
                selectors: (primary_title: "h1.name"),
            )"#,
        )
        .unwrap();

        let config = CrawlConfig::load(&path).expect("load");

        assert_eq!(config.category_id, "20");
        assert_eq!(config.end_page, 5);
        assert_eq!(config.start_page, 1);
        assert_eq!(config.max_workers, 15);
        assert_eq!(config.selectors.primary_title, "h1.name");
        assert_eq!(
            config.selectors.list_anchor,
            ExtractorSelectors::default().list_anchor
        );
        assert!(config.pipeline_settings().list_pacing.is_none());
    }

    #[test]
    fn unreadable_or_malformed_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");
        assert!(matches!(
            CrawlConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.ron");
        fs::write(&broken, "(base_url: ").unwrap();
        assert!(matches!(
            CrawlConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let cases = [
            CrawlConfig {
                base_url: "example.com".to_string(),
                ..valid()
            },
            CrawlConfig {
                base_url: "ftp://example.com".to_string(),
                ..valid()
            },
            CrawlConfig {
                start_page: 0,
                ..valid()
            },
            CrawlConfig {
                start_page: 3,
                end_page: 2,
                ..valid()
            },
            CrawlConfig {
                max_workers: 0,
                ..valid()
            },
            CrawlConfig {
                list_workers: 0,
                ..valid()
            },
            CrawlConfig {
                request_timeout_secs: 0,
                ..valid()
            },
            CrawlConfig {
                list_delay_ms: (900, 100),
                ..valid()
            },
            CrawlConfig {
                user_agents: vec!["  ".to_string()],
                ..valid()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn engine_settings_follow_the_config() {
        let config = CrawlConfig {
            max_workers: 4,
            list_workers: 6,
            retry_count: 1,
            request_timeout_secs: 7,
            user_agents: vec![" ua-1 ".to_string(), String::new()],
            ..valid()
        };

        let fetch = config.fetch_settings();
        assert_eq!(fetch.request_timeout, Duration::from_secs(7));
        assert_eq!(fetch.pool_size, 12);
        assert_eq!(fetch.retry.max_attempts(), 2);
        assert_eq!(fetch.user_agents, vec!["ua-1".to_string()]);

        let pipeline = config.pipeline_settings();
        assert_eq!(pipeline.detail_workers, 4);
        assert_eq!(pipeline.list_workers, 6);
        assert_eq!(
            pipeline.target.page_url(3),
            "https://example.com/index.php/vod/type/id/63/page/3.html"
        );
        assert_eq!(
            pipeline.list_pacing,
            Some(ListPacing {
                min: Duration::from_millis(500),
                max: Duration::from_millis(1200),
            })
        );
    }
}
