use thiserror::Error;

/// Temporary failure for a single URL: the Retry Controller may retry it
/// within the URL's attempt budget.
#[derive(Error, Debug, Clone)]
pub enum TransientFault {
    #[error("timeout after {0}s")]
    Timeout(u64),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("retryable HTTP status {status}")]
    HttpStatus {
        status: u16,
        retry_after: Option<u64>,
    },
}

impl TransientFault {
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            TransientFault::HttpStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Permanent failure for a single URL. The crawl continues; this URL is
/// marked `failed`.
#[derive(Error, Debug, Clone)]
pub enum PageFault {
    #[error("non-retriable HTTP status {0}")]
    HttpStatus(u16),
    #[error("unsupported or missing content-type: {0:?}")]
    UnsupportedContentType(Option<String>),
    #[error("empty body")]
    EmptyBody,
    #[error("parse error: {0}")]
    Parse(String),
    #[error("max attempts reached")]
    MaxAttemptsReached,
}

impl PageFault {
    /// Short diagnostic string, truncated to the Ledger's 100-char budget.
    pub fn short(&self) -> String {
        self.to_string().chars().take(100).collect()
    }
}

/// Permanent failure for the whole run: disk, ledger, or other I/O the
/// operator must fix before restarting.
#[derive(Error, Debug)]
pub enum EnvironmentFault {
    #[error("ledger error: {0}")]
    Ledger(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnvironmentFault {
    pub fn ledger(err: impl std::fmt::Display) -> Self {
        EnvironmentFault::Ledger(err.to_string())
    }
}

/// Top-level taxonomy a single visit attempt can raise (spec §7).
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Transient(#[from] TransientFault),
    #[error(transparent)]
    Page(#[from] PageFault),
    #[error(transparent)]
    Environment(#[from] EnvironmentFault),
}
