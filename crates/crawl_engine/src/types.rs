use std::fmt;

/// A fetched and decoded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects; relative links on the page resolve against this.
    pub final_url: String,
    pub bytes: Vec<u8>,
    pub html: String,
    /// Name of the sniffed encoding, e.g. `UTF-8` or `GBK`.
    pub encoding: String,
    pub content_type: Option<String>,
    /// Number of requests it took, retries included.
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 1,
        }
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Connect,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    ClientBuild,
    Network,
}

impl FailureKind {
    /// Whether another attempt may succeed: throttling, server-side errors,
    /// timeouts and connection failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureKind::HttpStatus(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            FailureKind::Timeout | FailureKind::Connect | FailureKind::Network => true,
            FailureKind::InvalidUrl
            | FailureKind::RedirectLimitExceeded
            | FailureKind::TooLarge { .. }
            | FailureKind::ClientBuild => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Connect => write!(f, "connection failed"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::ClientBuild => write!(f, "http client setup failed"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FailureKind;

    #[test]
    fn retryable_statuses_match_the_fixed_set() {
        for code in [429, 500, 502, 503, 504] {
            assert!(FailureKind::HttpStatus(code).is_retryable(), "{code}");
        }
        for code in [400, 403, 404, 501] {
            assert!(!FailureKind::HttpStatus(code).is_retryable(), "{code}");
        }
        assert!(FailureKind::Timeout.is_retryable());
        assert!(FailureKind::Connect.is_retryable());
        assert!(!FailureKind::InvalidUrl.is_retryable());
    }
}
