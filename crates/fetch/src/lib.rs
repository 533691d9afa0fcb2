use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use scopecrawl_core::{ContentKind, FetchConfig, FetchedPage, PageFault, TransientFault, RETRY_CODES};

/// Synthetic connection/timeout failure rate when `inject_errors` is set
/// (spec §6: ~5% of requests).
const INJECTED_NETWORK_ERROR_RATE: f64 = 0.05;
/// Synthetic bad-status failure rate when `inject_errors` is set (spec
/// §6: ~10% of requests).
const INJECTED_STATUS_ERROR_RATE: f64 = 0.10;
const INJECTED_STATUSES: [u16; 8] = [429, 500, 502, 503, 504, 403, 404, 501];

/// The single HTTP network this crawler speaks (spec §4.3). There is no
/// driver trait here: one network, one concrete client.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, PageFault> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html, text/plain"));
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| PageFault::Parse(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Fetches `url`, classifying the outcome per spec §4.3: HTTP 200 with
    /// a non-empty body and an accepted content-type is a success; the
    /// retryable status set is a `TransientFault`; anything else non-200
    /// is a permanent `PageFault`.
    pub async fn get(&self, url: &Url) -> Result<FetchedPage, CrawlOutcome> {
        if self.config.inject_errors {
            self.maybe_inject()?;
        }

        debug!(url = %url, "fetching");
        let resp = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "fetch failed");
            if e.is_timeout() {
                CrawlOutcome::Transient(TransientFault::Timeout(self.config.timeout.as_secs()))
            } else {
                CrawlOutcome::Transient(TransientFault::Connection(e.to_string()))
            }
        })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let code = status.as_u16();
            if RETRY_CODES.contains(&code) {
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                return Err(CrawlOutcome::Transient(TransientFault::HttpStatus {
                    status: code,
                    retry_after,
                }));
            }
            return Err(CrawlOutcome::Page(PageFault::HttpStatus(code)));
        }

        let media_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let content_kind = media_type
            .as_deref()
            .and_then(ContentKind::from_media_type)
            .ok_or_else(|| CrawlOutcome::Page(PageFault::UnsupportedContentType(media_type.clone())))?;

        let body = resp
            .text()
            .await
            .map_err(|e| CrawlOutcome::Transient(TransientFault::Connection(e.to_string())))?;

        if body.is_empty() {
            return Err(CrawlOutcome::Page(PageFault::EmptyBody));
        }

        Ok(FetchedPage { content_kind, body })
    }

    fn maybe_inject(&self) -> Result<(), CrawlOutcome> {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < INJECTED_NETWORK_ERROR_RATE {
            return Err(if rng.gen_bool(0.5) {
                CrawlOutcome::Transient(TransientFault::Timeout(self.config.timeout.as_secs()))
            } else {
                CrawlOutcome::Transient(TransientFault::Connection(
                    "simulated connection error".to_string(),
                ))
            });
        }
        if rng.gen::<f64>() < INJECTED_STATUS_ERROR_RATE {
            let code = INJECTED_STATUSES[rng.gen_range(0..INJECTED_STATUSES.len())];
            return Err(if RETRY_CODES.contains(&code) {
                CrawlOutcome::Transient(TransientFault::HttpStatus {
                    status: code,
                    retry_after: None,
                })
            } else {
                CrawlOutcome::Page(PageFault::HttpStatus(code))
            });
        }
        Ok(())
    }
}

/// Split so callers (the Retry Controller) can match on fault kind
/// without downcasting `CrawlError`.
#[derive(Debug)]
pub enum CrawlOutcome {
    Transient(TransientFault),
    Page(PageFault),
}

impl From<CrawlOutcome> for scopecrawl_core::CrawlError {
    fn from(outcome: CrawlOutcome) -> Self {
        match outcome {
            CrawlOutcome::Transient(t) => t.into(),
            CrawlOutcome::Page(p) => p.into(),
        }
    }
}
