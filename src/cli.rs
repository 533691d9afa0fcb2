use clap::Parser;

/// A resumable, single-domain web crawler (spec §6).
#[derive(Parser, Debug)]
#[command(name = "scopecrawl", about = "Resumable single-domain web crawler")]
pub struct Cli {
    /// Start URL; also the scope anchor for every link the crawler follows.
    pub url: String,

    /// Working directory: holds the lock, the database, logs, and artifacts.
    pub workdir: String,

    /// Maximum link depth from the start URL.
    #[arg(short = 'd', long = "depth", default_value_t = 1)]
    pub depth: u32,

    /// Maximum fetch attempts per URL before it is marked failed.
    #[arg(short = 'a', long = "attempts", default_value_t = 2)]
    pub attempts: u32,

    /// Run headless (no dashboard). Accepted for forward compatibility
    /// with a future UI binary; this core always runs headless.
    #[arg(long = "no-ui")]
    pub no_ui: bool,

    /// Enable synthetic fault injection in the fetcher and link extractor.
    #[arg(short = 'e', long = "inject-errors")]
    pub inject_errors: bool,

    /// Purge the working directory before starting a fresh crawl.
    #[arg(short = 'p', long = "purge")]
    pub purge: bool,
}
