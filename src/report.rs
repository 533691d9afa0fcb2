use std::fmt::Write as _;

use scopecrawl_core::{EngineConfig, EnvironmentFault, PageStatus};
use scopecrawl_frontier::Frontier;

/// Writes `report.txt` once, at clean completion of the Crawl Loop
/// (ported from `reporting.py::write_report_file`; the source's UI
/// re-renders this periodically, which is a dashboard concern out of
/// this core's scope).
pub struct Reporter<'a> {
    config: &'a EngineConfig,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub async fn write(&self, frontier: &Frontier) -> Result<(), EnvironmentFault> {
        let pages = frontier.all_pages().await?;
        let visited = pages.iter().filter(|p| p.status == PageStatus::Visited).count();
        let failed = pages.iter().filter(|p| p.status == PageStatus::Failed).count();
        let queued = pages.iter().filter(|p| p.status == PageStatus::Queued).count();

        let mean_attempts = frontier.mean_attempts().await?;
        let mean_fetch_seconds = frontier.mean_fetch_seconds().await?;
        let histogram = frontier.error_histogram().await?;
        let words = frontier.word_counts().await?;
        let start_url = frontier.start_url().await?.unwrap_or_else(|| self.config.start_url.to_string());

        let mut report = String::new();
        let sep = "-----------------------------------------------------------\n";

        let _ = write!(
            report,
            "{sep}\nCRAWL {start_url} -> {} (max_depth: {}, max_attempts: {})\n",
            self.config.workdir.display(),
            self.config.max_depth,
            self.config.max_attempts,
        );
        if visited + failed > 0 && queued == 0 {
            let _ = write!(
                report,
                "\nCRAWL COMPLETED\n\n\
                 Original web pages stored in:  {}/pages/\n\
                 Pages in plain text stored in: {}/text/\n\
                 Final word counts stored in:   {}/words/\n",
                self.config.workdir.display(),
                self.config.workdir.display(),
                self.config.workdir.display(),
            );
        }
        let _ = write!(
            report,
            "\n\n{sep}PROGRESS STATS:\n\n{visited:8} pages downloaded\n{failed:8} pages failed\n{queued:8} pages still queued\n"
        );

        let _ = write!(report, "\n\n{sep}FILES PRODUCED:\n\n");
        let _ = writeln!(report, "  pages/: {}", count_files(self.config.pages_dir()));
        let _ = writeln!(report, "   text/: {}", count_files(self.config.text_dir()));
        let _ = writeln!(report, "  words/: {}", count_files(self.config.words_dir()));
        if !pages.is_empty() {
            let _ = write!(
                report,
                "\nSTATISTICS (per page):\n\n  mean attempts:       {mean_attempts:.2}\n\n  mean fetch duration: {mean_fetch_seconds:.3} secs\n"
            );
        }

        let _ = write!(report, "\n\n{sep}ERROR COUNTS:\n\n");
        if histogram.is_empty() || (histogram.len() == 1 && histogram[0].0 == "none") {
            let _ = writeln!(report, "no errors");
        } else {
            for (error, count) in &histogram {
                if error == "none" {
                    continue;
                }
                let _ = writeln!(report, "{count:8} {error}");
            }
        }

        let _ = write!(report, "\n\n{sep}TOP(50) WORD COUNTS:\n\n");
        for (word, count) in words.iter().take(50) {
            let _ = writeln!(report, "{count:8} {word}");
        }
        let _ = write!(report, "\n\n{sep}");

        std::fs::write(self.config.report_path(), report).map_err(EnvironmentFault::from)
    }
}

fn count_files(dir: std::path::PathBuf) -> usize {
    fn walk(dir: &std::path::Path, count: &mut usize) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(&path, count);
            } else {
                *count += 1;
            }
        }
    }
    let mut count = 0;
    walk(&dir, &mut count);
    count
}
