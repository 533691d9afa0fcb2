use std::collections::HashMap;
use std::path::PathBuf;

use rand::Rng;
use tracing::debug;

use scopecrawl_core::{ContentKind, EngineConfig, EnvironmentFault};

/// ~1% synthetic write failure when error injection is enabled — rare
/// enough not to dominate the failure mix, which is mostly fetch/status
/// faults (spec §6 open question: `-e` is the single switch for every
/// synthetic fault in this target).
const INJECTED_IO_ERROR_RATE: f64 = 0.01;

/// Persists raw bytes, extracted text, and per-page word counts under
/// `workdir` (spec §4.7). Path derivation: strip the scope prefix,
/// default to `index.html`, append an extension inferred from the
/// content-type when the path has none.
pub struct ArtifactStore<'a> {
    config: &'a EngineConfig,
}

impl<'a> ArtifactStore<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Writes `pages/<relpath>`, `text/<relpath with .html -> .txt>`, and
    /// (when non-empty) `words/<relpath with extension -> .json>`.
    /// Returns the extracted visible text, reused by the caller for word
    /// counting.
    pub fn save(
        &self,
        url: &str,
        content_kind: ContentKind,
        body: &str,
        word_counts: &HashMap<String, u64>,
    ) -> Result<String, EnvironmentFault> {
        self.maybe_inject_io_fault()?;

        let relpath = self.relative_path(url, content_kind);
        debug!(url, relpath = %relpath, "saving artifacts");

        if !body.is_empty() {
            self.write_under(self.config.pages_dir(), &relpath, body)?;
        }

        let text = scopecrawl_parser::extract_text(content_kind, body);
        let text_path = relpath.replace(".html", ".txt");
        self.write_under(self.config.text_dir(), &text_path, &text)?;

        if !word_counts.is_empty() {
            let json_path = relpath.replace(".html", ".json").replace(".txt", ".json");
            let json = serde_json::to_string(word_counts)
                .map_err(|e| EnvironmentFault::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
            self.write_under(self.config.words_dir(), &json_path, &json)?;
        }

        Ok(text)
    }

    /// `url` with the scope prefix stripped, trailing slash removed, and
    /// an extension appended from `content_kind` if the remaining path
    /// has none. Empty result becomes `index.html` (spec §4.7).
    fn relative_path(&self, url: &str, content_kind: ContentKind) -> String {
        let trimmed = url.trim_end_matches('/');
        let with_extension = if has_extension(trimmed) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{}", content_kind.extension())
        };

        let stripped = with_extension
            .strip_prefix(&self.config.scope_prefix)
            .unwrap_or(&with_extension)
            .trim_start_matches('/');

        if stripped.is_empty() {
            "index.html".to_string()
        } else {
            stripped.to_string()
        }
    }

    fn write_under(&self, dir: PathBuf, relpath: &str, content: &str) -> Result<(), EnvironmentFault> {
        let path = dir.join(relpath);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn maybe_inject_io_fault(&self) -> Result<(), EnvironmentFault> {
        if self.config.inject_errors && rand::thread_rng().gen::<f64>() < INJECTED_IO_ERROR_RATE {
            return Err(EnvironmentFault::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated artifact write error",
            )));
        }
        Ok(())
    }
}

fn has_extension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .map(|last| last.contains('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn config(dir: &std::path::Path) -> EngineConfig {
        EngineConfig::new(
            Url::parse("https://s.example.com").unwrap(),
            dir,
            1,
            2,
            true,
            false,
            false,
        )
    }

    #[test]
    fn derives_index_html_for_scope_root() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let store = ArtifactStore::new(&cfg);
        let path = store.relative_path("https://s.example.com", ContentKind::Html);
        assert_eq!(path, "index.html");
    }

    #[test]
    fn appends_extension_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let store = ArtifactStore::new(&cfg);
        let path = store.relative_path("https://s.example.com/about", ContentKind::Html);
        assert_eq!(path, "about.html");
    }

    #[test]
    fn leaves_existing_extension_alone() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let store = ArtifactStore::new(&cfg);
        let path = store.relative_path("https://s.example.com/notes.txt", ContentKind::Text);
        assert_eq!(path, "notes.txt");
    }

    #[test]
    fn save_writes_pages_text_and_words() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let store = ArtifactStore::new(&cfg);
        let mut counts = HashMap::new();
        counts.insert("hi".to_string(), 1u64);

        let text = store
            .save(
                "https://s.example.com/about",
                ContentKind::Html,
                "<p>hi</p>",
                &counts,
            )
            .unwrap();
        assert_eq!(text, "hi");
        assert!(dir.path().join("pages/about.html").exists());
        assert!(dir.path().join("text/about.txt").exists());
        assert!(dir.path().join("words/about.json").exists());
    }
}
