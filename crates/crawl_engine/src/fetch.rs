use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::decode::decode_html;
use crate::{FailureKind, FetchError, FetchedPage};

pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/131.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 Chrome/131.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/131.0 Safari/537.36",
];

/// Exponential backoff for transient failures.
///
/// The delay before retry `n` (1-based) is `backoff_base * backoff_multiplier^(n-1)`,
/// capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_base: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_base: Duration::from_millis(1500),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// No retries at all; every failure is final.
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.backoff_base.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map(|delay| delay.min(self.max_backoff))
            .unwrap_or(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Idle connections kept per host. Keep it at or above the worker count
    /// so concurrent workers never wait on the pool.
    pub pool_size: usize,
    /// One is picked at random for every request.
    pub user_agents: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            pool_size: 30,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Source of pages for both crawl phases.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// HTTP fetcher over one pooled `reqwest::Client`; safe to share between workers.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

struct RawResponse {
    final_url: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .pool_max_idle_per_host(settings.pool_size)
            .build()
            .map_err(|err| FetchError::new(FailureKind::ClientBuild, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn pick_user_agent(&self) -> Option<&str> {
        let pool = &self.settings.user_agents;
        if pool.is_empty() {
            None
        } else {
            Some(pool[fastrand::usize(..pool.len())].as_str())
        }
    }

    async fn fetch_once(&self, url: &reqwest::Url) -> Result<RawResponse, FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(agent) = self.pick_user_agent() {
            request = request.header(USER_AGENT, agent);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, content_len));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            final_url,
            content_type,
            bytes,
        })
    }
}

#[async_trait::async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let max_attempts = self.settings.retry.max_attempts();
        let mut attempt = 1;
        let raw = loop {
            match self.fetch_once(&parsed).await {
                Ok(raw) => break raw,
                Err(err) if err.kind.is_retryable() && attempt < max_attempts => {
                    let delay = self.settings.retry.delay_for(attempt);
                    engine_warn!(
                        "fetch {} failed ({}), retry {}/{} in {:?}",
                        url,
                        err,
                        attempt,
                        self.settings.retry.retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.with_attempts(attempt)),
            }
        };

        let decoded = decode_html(&raw.bytes);
        if decoded.had_errors {
            engine_debug!(
                "{} decoded as {} with replacement characters",
                url,
                decoded.encoding_label
            );
        }

        Ok(FetchedPage {
            url: url.to_string(),
            final_url: raw.final_url,
            bytes: raw.bytes,
            html: decoded.html,
            encoding: decoded.encoding_label,
            content_type: raw.content_type,
            attempts: attempt,
        })
    }
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_connect() {
        return FetchError::new(FailureKind::Connect, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use std::time::Duration;

    #[test]
    fn backoff_grows_by_multiplier_and_caps() {
        let policy = RetryPolicy {
            retries: 5,
            backoff_base: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(60), Duration::from_millis(500));
    }
}
