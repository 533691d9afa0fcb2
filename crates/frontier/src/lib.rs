use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use url::Url;

use scopecrawl_core::{EnvironmentFault, PageRow, QueuedUrl, ResumeConfig};
use scopecrawl_storage::Ledger;

/// The durable URL frontier: normalizes URLs at the enqueue boundary and
/// delegates persistence to the Ledger. Splitting normalization from
/// storage keeps the unique-constraint-backed idempotence (spec §9) in
/// one place regardless of which caller enqueues a link.
pub struct Frontier {
    ledger: Ledger,
}

impl Frontier {
    pub async fn open(db_path: &Path) -> Result<Self, EnvironmentFault> {
        Ok(Self {
            ledger: Ledger::open(db_path).await?,
        })
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Strip the fragment and any trailing slash, matching the Page
    /// record's `url` key exactly (spec §3: "fragment stripped, no
    /// trailing slash").
    pub fn normalize(url: &Url) -> String {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        let path = normalized.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            normalized.set_path(&path[..path.len() - 1]);
        }
        normalized.to_string()
    }

    pub async fn enqueue(&self, url: &Url, depth: u32) -> Result<(), EnvironmentFault> {
        let normalized = Self::normalize(url);
        debug!(url = %normalized, depth, "enqueue");
        self.ledger.enqueue(&normalized, depth).await
    }

    /// Enqueue an already-normalized URL string (used by the start URL,
    /// which is stored verbatim once normalized by the caller).
    pub async fn enqueue_str(&self, url: &str, depth: u32) -> Result<(), EnvironmentFault> {
        self.ledger.enqueue(url, depth).await
    }

    pub async fn peek(&self) -> Result<Option<QueuedUrl>, EnvironmentFault> {
        self.ledger.peek().await
    }

    pub async fn mark_attempt(&self, url: &str) -> Result<(), EnvironmentFault> {
        self.ledger.mark_attempt(url).await
    }

    pub async fn decrease_attempt(&self, url: &str) -> Result<(), EnvironmentFault> {
        self.ledger.decrease_attempt(url).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn log_attempt(
        &self,
        sid: i64,
        url: &str,
        depth: u32,
        ordinal: u32,
        http_status: Option<u16>,
        fetch_seconds: f64,
        error: Option<&str>,
    ) -> Result<(), EnvironmentFault> {
        self.ledger
            .log_attempt(sid, url, depth, ordinal, http_status, fetch_seconds, error)
            .await
    }

    pub async fn mark_failure(&self, url: &str, error: &str) -> Result<(), EnvironmentFault> {
        self.ledger.mark_failure(url, error).await
    }

    pub async fn commit_success(
        &self,
        url: &str,
        word_counts: &HashMap<String, u64>,
    ) -> Result<(), EnvironmentFault> {
        self.ledger.commit_success(url, word_counts).await
    }

    pub async fn length(&self) -> Result<u64, EnvironmentFault> {
        self.ledger.length().await
    }

    pub async fn start_url(&self) -> Result<Option<String>, EnvironmentFault> {
        self.ledger.start_url().await
    }

    pub async fn save_resume_config(&self, cfg: &ResumeConfig) -> Result<(), EnvironmentFault> {
        self.ledger.save_resume_config(cfg).await
    }

    pub async fn load_resume_config(&self) -> Result<Option<ResumeConfig>, EnvironmentFault> {
        self.ledger.load_resume_config().await
    }

    pub async fn all_pages(&self) -> Result<Vec<PageRow>, EnvironmentFault> {
        self.ledger.all_pages().await
    }

    pub async fn word_counts(&self) -> Result<Vec<(String, i64)>, EnvironmentFault> {
        self.ledger.word_counts().await
    }

    pub async fn mean_attempts(&self) -> Result<f64, EnvironmentFault> {
        self.ledger.mean_attempts().await
    }

    pub async fn mean_fetch_seconds(&self) -> Result<f64, EnvironmentFault> {
        self.ledger.mean_fetch_seconds().await
    }

    pub async fn error_histogram(&self) -> Result<Vec<(String, i64)>, EnvironmentFault> {
        self.ledger.error_histogram().await
    }

    pub async fn close(&self) {
        self.ledger.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_fragment_and_trailing_slash() {
        let url = Url::parse("https://example.com/a/b/#section").unwrap();
        assert_eq!(Frontier::normalize(&url), "https://example.com/a/b");
    }

    #[test]
    fn normalize_keeps_root_slash() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(Frontier::normalize(&url), "https://example.com/");
    }

    #[tokio::test]
    async fn enqueue_then_peek_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let frontier = Frontier::open(&dir.path().join("state.db")).await.unwrap();
        let url = Url::parse("https://example.com/a/#x").unwrap();
        frontier.enqueue(&url, 1).await.unwrap();
        let next = frontier.peek().await.unwrap().unwrap();
        assert_eq!(next.url, "https://example.com/a");
        assert_eq!(next.depth, 1);
    }
}
