//! Content extraction: `(title, content)` from rendered markup.
//!
//! Content is the space-joined text of paragraph, heading, and list-item
//! elements in document order, run through a cleanup pass pipeline.
//! Each cleanup pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// Placeholder title for pages without a `<title>` element.
pub const NO_TITLE: &str = "No title";

/// Elements contributing to a page's textual content, in document order.
const CONTENT_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li";

/// Extracted page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Text of the first `<title>` element, or [`NO_TITLE`].
    pub title: String,
    /// Cleaned, space-joined element text.
    pub content: String,
}

/// Extract title and textual content from raw markup.
///
/// Malformed markup degrades to empty content rather than failing:
/// the HTML parser is lenient, and fragments it cannot make sense of
/// simply contribute no text.
pub fn extract(html: &str) -> Extracted {
    let doc = Html::parse_document(html);

    let title_sel = Selector::parse("title").expect("valid selector");
    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let content_sel = Selector::parse(CONTENT_SELECTOR).expect("valid selector");
    let content = doc
        .select(&content_sel)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");

    Extracted {
        title,
        content: clean_text(&content),
    }
}

// ---------------------------------------------------------------------------
// Cleanup passes
// ---------------------------------------------------------------------------

/// Run the full cleanup pipeline on extracted text.
pub fn clean_text(text: &str) -> String {
    let result = strip_non_ascii(text);
    let result = collapse_whitespace(&result);
    result.trim().to_string()
}

/// Pass 1: drop non-ASCII and non-printable characters.
///
/// Whitespace control characters survive so word boundaries reach the
/// collapse pass instead of words fusing together.
fn strip_non_ascii(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii() && (!c.is_ascii_control() || c.is_ascii_whitespace()))
        .collect()
}

/// Pass 2: collapse whitespace runs to single spaces.
fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    WS_RE.replace_all(text, " ").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_content_in_document_order() {
        let html = r#"<html><head><title>Welcome</title></head><body>
            <h1>Heading</h1>
            <p>First paragraph.</p>
            <ul><li>Item one</li><li>Item two</li></ul>
            <p>Last paragraph.</p>
        </body></html>"#;

        let page = extract(html);
        assert_eq!(page.title, "Welcome");
        assert_eq!(
            page.content,
            "Heading First paragraph. Item one Item two Last paragraph."
        );
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let html = "<html><body><p>No head here.</p></body></html>";
        let page = extract(html);
        assert_eq!(page.title, NO_TITLE);
        assert_eq!(page.content, "No head here.");
    }

    #[test]
    fn ignores_non_content_elements() {
        let html = r#"<html><head><title>T</title></head><body>
            <div>divs are skipped</div>
            <span>spans too</span>
            <p>only this</p>
        </body></html>"#;

        let page = extract(html);
        assert_eq!(page.content, "only this");
    }

    #[test]
    fn malformed_markup_degrades_to_empty_content() {
        let page = extract("<<<не html>>>");
        assert_eq!(page.title, NO_TITLE);
        assert_eq!(page.content, "");
    }

    #[test]
    fn clean_text_strips_non_ascii_and_collapses_whitespace() {
        let cleaned = clean_text("  Héllo\t\tworld\n\nagain  ");
        assert_eq!(cleaned, "Hllo world again");
    }

    #[test]
    fn clean_text_is_stable_on_clean_input() {
        let input = "Already clean text.";
        assert_eq!(clean_text(input), input);
    }

    #[test]
    fn headings_of_all_levels_are_included() {
        let html = "<html><body><h1>a</h1><h2>b</h2><h3>c</h3><h4>d</h4><h5>e</h5><h6>f</h6></body></html>";
        let page = extract(html);
        assert_eq!(page.content, "a b c d e f");
    }
}
