use std::time::Duration;

use tracing::{error, info, warn};
use url::Url;

use scopecrawl_core::{
    config::derive_scope_prefix, CrawlError, EngineConfig, FetchConfig, PageFault, QueuedUrl,
    ResumeConfig,
};
use scopecrawl_fetch::HttpFetcher;
use scopecrawl_frontier::Frontier;
use scopecrawl_parser::{count_words, extract_links, extract_text};

use crate::artifacts::ArtifactStore;
use crate::control::ControlBlock;
use crate::report::Reporter;
use crate::retry::RetryController;

/// Delay between iterations, ported from the source's `GET_PAGE_DELAY`.
const GET_PAGE_DELAY: Duration = Duration::from_millis(100);
/// Poll granularity while `pause` is set (spec §5).
const PAUSE_POLL: Duration = Duration::from_secs(1);

/// Drives the engine to completion or a clean stop, per spec §4.8.
/// Returns `Ok(())` on normal completion/clean stop, `Err` on a fatal
/// environment fault (the caller maps this to exit code 2).
pub async fn run(mut config: EngineConfig, control: ControlBlock) -> Result<(), CrawlError> {
    let frontier = Frontier::open(&config.db_path()).await?;

    if frontier.length().await? == 0 {
        let normalized = Frontier::normalize(&config.start_url);
        frontier.enqueue_str(&normalized, 0).await?;
        frontier
            .save_resume_config(&ResumeConfig {
                url: normalized,
                max_depth: config.max_depth,
            })
            .await?;
    } else if let Some(resumed) = frontier.load_resume_config().await? {
        info!("RESUME PREVIOUS CRAWL");
        if let Ok(resumed_url) = Url::parse(&resumed.url) {
            config.scope_prefix = derive_scope_prefix(&resumed_url);
            config.start_url = resumed_url;
        }
        config.max_depth = resumed.max_depth;
    }

    let fetch_config = FetchConfig {
        timeout: Duration::from_secs(5),
        user_agent: "ScopeCrawl/1.0 (+https://example.invalid/bot)".to_string(),
        inject_errors: config.inject_errors,
    };
    let fetcher = HttpFetcher::new(fetch_config)
        .map_err(|e| scopecrawl_core::EnvironmentFault::ledger(e.to_string()))?;
    let retry = RetryController::new(&fetcher);
    let artifacts = ArtifactStore::new(&config);
    let reporter = Reporter::new(&config);
    let domain = config.start_url.host_str().unwrap_or("").to_string();

    loop {
        while control.is_paused() {
            tokio::time::sleep(PAUSE_POLL).await;
        }
        if control.is_stopped() {
            info!("stop flag set, exiting cleanly");
            break;
        }

        let Some(queued) = frontier.peek().await? else {
            info!("frontier drained, crawl complete");
            break;
        };

        match visit(&config, &domain, &frontier, &retry, &artifacts, &queued).await {
            Ok(()) => {}
            Err(CrawlError::Page(fault)) => {
                warn!(url = %queued.url, error = %fault, "page failed");
                frontier.mark_failure(&queued.url, &fault.short()).await?;
            }
            Err(CrawlError::Environment(fault)) => {
                error!(url = %queued.url, error = %fault, "environment fault, aborting run");
                frontier.decrease_attempt(&queued.url).await?;
                return Err(fault.into());
            }
            Err(CrawlError::Transient(fault)) => {
                // The Retry Controller never lets a TransientFault escape;
                // handled defensively so a future controller change can't
                // silently panic the loop.
                warn!(url = %queued.url, error = %fault, "unexpected transient fault reached crawl loop");
                frontier.mark_failure(&queued.url, &fault.to_string()).await?;
            }
        }

        tokio::time::sleep(GET_PAGE_DELAY).await;
    }

    reporter.write(&frontier).await?;
    frontier.close().await;
    Ok(())
}

async fn visit(
    config: &EngineConfig,
    domain: &str,
    frontier: &Frontier,
    retry: &RetryController<'_>,
    artifacts: &ArtifactStore<'_>,
    queued: &QueuedUrl,
) -> Result<(), CrawlError> {
    let page = retry.fetch(frontier, queued, config.max_attempts).await?;

    let base_url = Url::parse(&queued.url).map_err(|e| {
        CrawlError::Page(PageFault::Parse(format!("stored url is not a valid url: {e}")))
    })?;

    let links = extract_links(
        &base_url,
        domain,
        &config.scope_prefix,
        page.content_kind,
        &page.body,
        queued.depth,
        config.max_depth,
        config.inject_errors,
    )?;
    for link in links {
        if let Ok(link_url) = Url::parse(&link) {
            frontier.enqueue(&link_url, queued.depth + 1).await?;
        }
    }

    let text = extract_text(page.content_kind, &page.body);
    let word_counts = count_words(&text);
    artifacts.save(&queued.url, page.content_kind, &page.body, &word_counts)?;
    frontier.commit_success(&queued.url, &word_counts).await?;
    Ok(())
}
