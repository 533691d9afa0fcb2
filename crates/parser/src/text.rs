use scraper::Html;

use scopecrawl_core::ContentKind;

/// Visible-text extraction (spec §4.6). For `text/html`, text nodes are
/// trimmed individually and joined with newlines; empty nodes are
/// dropped. For `text/plain`, the body passes through unchanged.
pub fn extract_text(content_kind: ContentKind, body: &str) -> String {
    match content_kind {
        ContentKind::Text => body.to_string(),
        ContentKind::Html => {
            let document = Html::parse_document(body);
            document
                .root_element()
                .text()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}
