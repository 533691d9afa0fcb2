use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single Page row (spec data model §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Queued,
    Visited,
    Failed,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Queued => "queued",
            PageStatus::Visited => "visited",
            PageStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "visited" => PageStatus::Visited,
            "failed" => PageStatus::Failed,
            _ => PageStatus::Queued,
        }
    }
}

/// One Page record, one per distinct URL.
#[derive(Debug, Clone)]
pub struct PageRow {
    pub sid: i64,
    pub url: String,
    pub depth: u32,
    pub status: PageStatus,
    pub attempts: u32,
    pub inserted_at: DateTime<Utc>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Row returned by `peek`: the next queued URL to visit.
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    pub sid: i64,
    pub url: String,
    pub depth: u32,
    pub attempts: u32,
}

/// The first-run snapshot that survives across resumes (spec §6: `url`
/// and `max_depth` override CLI on resume; `max_attempts` does not).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeConfig {
    pub url: String,
    pub max_depth: u32,
}

/// Content-Type, normalized to the media type before `;` (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Text,
}

impl ContentKind {
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type.trim().to_ascii_lowercase().as_str() {
            "text/html" => Some(ContentKind::Html),
            "text/plain" => Some(ContentKind::Text),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContentKind::Html => ".html",
            ContentKind::Text => ".txt",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Enables the synthetic error-injection mode (CLI `-e`).
    pub inject_errors: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: "ScopeCrawl/1.0 (+https://example.invalid/bot)".to_string(),
            inject_errors: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub content_kind: ContentKind,
    pub body: String,
}

/// Retryable HTTP status codes (spec §4.3).
pub const RETRY_CODES: [u16; 5] = [429, 500, 502, 503, 504];
