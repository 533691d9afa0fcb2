use rand::Rng;
use scraper::{Html, Selector};
use url::Url;

use scopecrawl_core::{ContentKind, PageFault};

/// A 5% synthetic parse failure, gated by `-e` (spec §4.5, §9 open
/// question: gated by the flag in this target, not unconditional).
const PARSE_FAILURE_RATE: f64 = 0.05;

const ALLOWED_SUFFIXES: [&str; 4] = [".html", ".htm", ".txt", "/"];

/// Validity predicate for an `href` (spec §4.5). Two layered checks that
/// are deliberately kept separate (spec §9 design note): a suffix/path
/// shape check here, and the scope-prefix check on the resolved absolute
/// URL in `extract_links`.
fn is_valid_link(href: &str, domain: &str) -> bool {
    if href.is_empty() || href.contains(':') {
        return false;
    }

    let (netloc, path) = split_netloc_path(href);
    if !netloc.is_empty() && !netloc.ends_with(domain) {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    if !ALLOWED_SUFFIXES.iter().any(|suf| lower.ends_with(suf)) {
        // Allow "clean" extensionless paths like /about; reject unknown
        // extensions like /script.js.
        if let Some(last_segment) = path.rsplit('/').next() {
            if last_segment.contains('.') {
                return false;
            }
        }
    }

    true
}

/// Splits an href into (netloc, path) the way `urlparse` would, without
/// assuming a scheme is present (scheme-bearing hrefs are already
/// rejected by the colon check before this runs).
fn split_netloc_path(href: &str) -> (String, String) {
    if let Some(rest) = href.strip_prefix("//") {
        let mut parts = rest.splitn(2, '/');
        let netloc = parts.next().unwrap_or("").to_string();
        let path = match parts.next() {
            Some(p) => format!("/{p}"),
            None => String::new(),
        };
        (netloc, path)
    } else {
        (String::new(), href.to_string())
    }
}

/// Parse `body` as HTML, yield same-scope absolute links at `depth + 1`.
/// Guards: empty body, non-HTML content, or `depth >= max_depth` all
/// short-circuit to an empty result (spec §4.5).
pub fn extract_links(
    base_url: &Url,
    domain: &str,
    scope_prefix: &str,
    content_kind: ContentKind,
    body: &str,
    depth: u32,
    max_depth: u32,
    inject_errors: bool,
) -> Result<Vec<String>, PageFault> {
    if inject_errors && rand::thread_rng().gen::<f64>() < PARSE_FAILURE_RATE {
        return Err(PageFault::Parse("simulated page parsing error".to_string()));
    }

    if body.is_empty() || content_kind != ContentKind::Html || depth >= max_depth {
        return Ok(Vec::new());
    }

    let document = Html::parse_document(body);
    let anchors = Selector::parse("a[href]").expect("static selector");

    let mut links = Vec::new();
    for el in document.select(&anchors) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if !is_valid_link(href, domain) {
            continue;
        }
        let Ok(mut resolved) = base_url.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        let mut full = resolved.to_string();
        while full.len() > scope_prefix.len() && full.ends_with('/') {
            full.pop();
        }
        if full.starts_with(scope_prefix) {
            links.push(full);
        }
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://s.example.com/index.html").unwrap()
    }

    #[test]
    fn rejects_scheme_bearing_hrefs() {
        assert!(!is_valid_link("mailto:a@b.com", "s.example.com"));
        assert!(!is_valid_link("javascript:void(0)", "s.example.com"));
        assert!(!is_valid_link("https://s.example.com/x.html", "s.example.com"));
    }

    #[test]
    fn accepts_relative_and_subdomain_links() {
        assert!(is_valid_link("/about.html", "example.com"));
        assert!(is_valid_link("//sub.example.com/x.html", "example.com"));
        assert!(!is_valid_link("//other.com/x.html", "example.com"));
    }

    #[test]
    fn rejects_unknown_extensions_accepts_clean_paths() {
        assert!(!is_valid_link("/app.js", "example.com"));
        assert!(is_valid_link("/about", "example.com"));
        assert!(is_valid_link("/a.htm", "example.com"));
    }

    #[test]
    fn extract_links_respects_depth_and_scope() {
        let html = r#"<html><body>
            <a href="a.html">a</a>
            <a href="/script.js">x</a>
            <a href="mailto:a@b.com">mail</a>
        </body></html>"#;
        let links = extract_links(
            &base(),
            "s.example.com",
            "https://s.example.com",
            ContentKind::Html,
            html,
            0,
            2,
            false,
        )
        .unwrap();
        assert_eq!(links, vec!["https://s.example.com/a.html".to_string()]);
    }

    #[test]
    fn extract_links_at_max_depth_yields_nothing() {
        let links = extract_links(
            &base(),
            "s.example.com",
            "https://s.example.com",
            ContentKind::Html,
            "<a href=\"a.html\">a</a>",
            1,
            1,
            false,
        )
        .unwrap();
        assert!(links.is_empty());
    }
}
