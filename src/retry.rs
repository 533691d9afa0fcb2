use std::time::{Duration, Instant};

use tracing::{info, warn};

use scopecrawl_core::{CrawlError, FetchedPage, PageFault, QueuedUrl, TransientFault};
use scopecrawl_fetch::{CrawlOutcome, HttpFetcher};
use scopecrawl_frontier::Frontier;

/// Default exponential-backoff base (spec §4.4).
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Wraps the Fetcher with bounded, backed-off retries (spec §4.4). The
/// only component that observes `TransientFault`; everything else sees
/// either a successful fetch or a `PageFault`.
pub struct RetryController<'a> {
    fetcher: &'a HttpFetcher,
}

impl<'a> RetryController<'a> {
    pub fn new(fetcher: &'a HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// Attempts `queued.url` up to `max_attempts` times total (including
    /// attempts already recorded for this URL from a prior run), doubling
    /// the delay each retry and honoring `Retry-After` when it is larger.
    /// Every attempt is recorded via `frontier.log_attempt`, successful or
    /// not.
    pub async fn fetch(
        &self,
        frontier: &Frontier,
        queued: &QueuedUrl,
        max_attempts: u32,
    ) -> Result<FetchedPage, CrawlError> {
        let mut ordinal = queued.attempts;

        loop {
            ordinal += 1;
            frontier.mark_attempt(&queued.url).await?;
            let started = Instant::now();

            match self.fetcher.get(&url::Url::parse(&queued.url).map_err(|e| {
                scopecrawl_core::EnvironmentFault::ledger(format!("invalid stored url: {e}"))
            })?).await {
                Ok(page) => {
                    frontier
                        .log_attempt(
                            queued.sid,
                            &queued.url,
                            queued.depth,
                            ordinal,
                            Some(200),
                            started.elapsed().as_secs_f64(),
                            None,
                        )
                        .await?;
                    return Ok(page);
                }
                Err(CrawlOutcome::Page(fault)) => {
                    let short = fault.short();
                    frontier
                        .log_attempt(
                            queued.sid,
                            &queued.url,
                            queued.depth,
                            ordinal,
                            http_status_of(&fault),
                            started.elapsed().as_secs_f64(),
                            Some(short.as_str()),
                        )
                        .await?;
                    return Err(fault.into());
                }
                Err(CrawlOutcome::Transient(fault)) => {
                    let message = fault.to_string();
                    frontier
                        .log_attempt(
                            queued.sid,
                            &queued.url,
                            queued.depth,
                            ordinal,
                            transient_status(&fault),
                            started.elapsed().as_secs_f64(),
                            Some(message.as_str()),
                        )
                        .await?;

                    if ordinal >= max_attempts {
                        warn!(url = %queued.url, attempts = ordinal, "max attempts reached");
                        return Err(PageFault::MaxAttemptsReached.into());
                    }

                    let delay = backoff_delay(ordinal, fault.retry_after());
                    info!(url = %queued.url, attempt = ordinal, delay_ms = delay.as_millis() as u64, "retrying after transient fault");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn http_status_of(fault: &PageFault) -> Option<u16> {
    match fault {
        PageFault::HttpStatus(status) => Some(*status),
        _ => None,
    }
}

fn transient_status(fault: &TransientFault) -> Option<u16> {
    match fault {
        TransientFault::HttpStatus { status, .. } => Some(*status),
        _ => None,
    }
}

/// `max(Retry-After, base * 2^ordinal)` (spec §4.4).
fn backoff_delay(ordinal: u32, retry_after: Option<u64>) -> Duration {
    let exponential = BASE_DELAY * 2u32.saturating_pow(ordinal);
    match retry_after {
        Some(secs) => exponential.max(Duration::from_secs(secs)),
        None => exponential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_ordinal() {
        assert_eq!(backoff_delay(1, None), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, None), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, None), Duration::from_secs(8));
    }

    #[test]
    fn backoff_honors_larger_retry_after() {
        assert_eq!(backoff_delay(1, Some(10)), Duration::from_secs(10));
        assert_eq!(backoff_delay(4, Some(2)), Duration::from_secs(16));
    }
}
