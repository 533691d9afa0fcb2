use std::path::{Path, PathBuf};

use url::Url;

/// The engine's entire configuration surface: CLI flags plus the scope
/// derived from the start URL. There is no app-config file — the
/// resumable piece (`url`, `max_depth`) lives in the Ledger's `config`
/// table instead (spec §6).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub start_url: Url,
    pub workdir: PathBuf,
    pub max_depth: u32,
    pub max_attempts: u32,
    pub headless: bool,
    pub inject_errors: bool,
    pub purge: bool,
    /// `scheme://host` anchor; membership is by `starts_with`.
    pub scope_prefix: String,
}

impl EngineConfig {
    pub fn new(
        start_url: Url,
        workdir: impl Into<PathBuf>,
        max_depth: u32,
        max_attempts: u32,
        headless: bool,
        inject_errors: bool,
        purge: bool,
    ) -> Self {
        let scope_prefix = derive_scope_prefix(&start_url);
        Self {
            start_url,
            workdir: workdir.into(),
            max_depth,
            max_attempts,
            headless,
            inject_errors,
            purge,
            scope_prefix,
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        self.workdir.join("lock")
    }

    pub fn db_path(&self) -> PathBuf {
        self.workdir.join("state.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.workdir.join("log.log")
    }

    pub fn report_path(&self) -> PathBuf {
        self.workdir.join("report.txt")
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.workdir.join("pages")
    }

    pub fn text_dir(&self) -> PathBuf {
        self.workdir.join("text")
    }

    pub fn words_dir(&self) -> PathBuf {
        self.workdir.join("words")
    }
}

/// `scheme://host`, no path, no trailing slash — the scope anchor
/// (spec §6, GLOSSARY).
pub fn derive_scope_prefix(url: &Url) -> String {
    format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""))
}

pub fn ensure_workdir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
