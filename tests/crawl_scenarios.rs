//! End-to-end scenarios against a scripted HTTP server, covering the
//! acceptance criteria in SPEC_FULL.md §8.

use scopecrawl::control::ControlBlock;
use scopecrawl_core::{EngineConfig, PageStatus};
use scopecrawl_frontier::Frontier;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_crawl(server: &MockServer, depth: u32, attempts: u32) -> (tempfile::TempDir, Frontier) {
    let dir = tempfile::tempdir().unwrap();
    let start_url = Url::parse(&server.uri()).unwrap();
    let config = EngineConfig::new(start_url, dir.path(), depth, attempts, true, false, false);
    scopecrawl::crawl::run(config, ControlBlock::new())
        .await
        .unwrap();
    let frontier = Frontier::open(&dir.path().join("state.db")).await.unwrap();
    (dir, frontier)
}

#[tokio::test]
async fn fresh_single_page_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>hi</body></html>").insert_header("content-type", "text/html"))
        .mount(&server)
        .await;

    let (dir, frontier) = run_crawl(&server, 1, 2).await;
    let pages = frontier.all_pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status, PageStatus::Visited);
    assert!(dir.path().join("pages/index.html").exists());
    assert!(dir.path().join("text/index.txt").exists());
}

#[tokio::test]
async fn two_pages_with_self_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><a href=\"a.html\">a</a></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><a href=\"/\">root</a></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let (_dir, frontier) = run_crawl(&server, 2, 2).await;
    let pages = frontier.all_pages().await.unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| p.status == PageStatus::Visited));
}

#[tokio::test]
async fn transient_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok").insert_header("content-type", "text/plain"))
        .mount(&server)
        .await;

    let (_dir, frontier) = run_crawl(&server, 1, 2).await;
    let pages = frontier.all_pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status, PageStatus::Visited);
    assert_eq!(pages[0].attempts, 2);
}

#[tokio::test]
async fn exhausted_retries_marks_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (_dir, frontier) = run_crawl(&server, 1, 2).await;
    let pages = frontier.all_pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status, PageStatus::Failed);
    assert!(pages[0].error.as_deref().unwrap_or("").to_lowercase().contains("max attempts"));
}

#[tokio::test]
async fn non_retriable_status_fails_after_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (_dir, frontier) = run_crawl(&server, 1, 2).await;
    let pages = frontier.all_pages().await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status, PageStatus::Failed);
    assert_eq!(pages[0].attempts, 1);
}

#[tokio::test]
async fn resume_keeps_first_run_depth_over_cli_override() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><a href=\"a.html\">a</a></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><a href=\"b.html\">b</a></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>leaf</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let start_url = Url::parse(&server.uri()).unwrap();

    // First run: depth 1, killed after root is visited but before `/a.html`.
    let first_config = EngineConfig::new(start_url.clone(), dir.path(), 1, 2, true, false, false);
    let control = ControlBlock::new();
    let stop_control = control.clone();
    let db_path = dir.path().join("state.db");
    let watcher = tokio::spawn(async move {
        loop {
            if let Ok(frontier) = Frontier::open(&db_path).await {
                let pages = frontier.all_pages().await.unwrap_or_default();
                if pages.iter().any(|p| p.status == PageStatus::Visited) {
                    stop_control.set_stop();
                    frontier.close().await;
                    break;
                }
                frontier.close().await;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    });
    scopecrawl::crawl::run(first_config, control).await.unwrap();
    watcher.await.unwrap();

    {
        let frontier = Frontier::open(&dir.path().join("state.db")).await.unwrap();
        let pages = frontier.all_pages().await.unwrap();
        assert!(pages.iter().any(|p| p.status == PageStatus::Visited));
        assert!(pages.iter().all(|p| !p.url.ends_with("a.html") || p.status != PageStatus::Visited));
        frontier.close().await;
    }

    // Resume: CLI asks for depth 5, but the persisted resume config (depth 1)
    // must prevail, so `/b.html` (depth 2) is never enqueued.
    let second_config = EngineConfig::new(start_url, dir.path(), 5, 2, true, false, false);
    scopecrawl::crawl::run(second_config, ControlBlock::new())
        .await
        .unwrap();

    let frontier = Frontier::open(&dir.path().join("state.db")).await.unwrap();
    let pages = frontier.all_pages().await.unwrap();
    assert_eq!(pages.len(), 2, "b.html must not be enqueued if first-run depth (1) prevails");
    assert!(pages.iter().all(|p| p.status == PageStatus::Visited));
    assert!(!pages.iter().any(|p| p.url.ends_with("b.html")));
}

#[tokio::test]
async fn depth_cutoff_stops_enqueueing_at_max_depth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><a href=\"a.html\">a</a></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><a href=\"b.html\">b</a></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let (_dir, frontier) = run_crawl(&server, 1, 2).await;
    let pages = frontier.all_pages().await.unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| !p.url.ends_with("b.html")));
}
