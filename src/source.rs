//! Discovery boundary: source items and manifest parsing.
//!
//! Discovery itself (crawling repository APIs, HTML pages, Markdown lists)
//! is an external collaborator. The pipeline consumes an already-expanded
//! sequence of `(url, suggested filename)` pairs, read here from a simple
//! line-oriented manifest.

use url::Url;

/// A candidate document produced by discovery: a URL and an optional
/// suggested filename. Immutable; consumed once by the fetch stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// The URL to download.
    pub url: String,
    /// Suggested output filename, when discovery knows one.
    pub suggested_name: Option<String>,
}

impl SourceItem {
    /// Creates a source item without a suggested filename.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            suggested_name: None,
        }
    }

    /// Creates a source item with a suggested filename.
    #[must_use]
    pub fn with_name(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            suggested_name: Some(name.into()),
        }
    }
}

/// Result of parsing a manifest: accepted items plus skipped input lines.
///
/// A malformed line contributes zero items and never aborts the collection.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Parsed source items, in manifest order.
    pub items: Vec<SourceItem>,
    /// Lines that could not be parsed as URLs.
    pub skipped: Vec<String>,
}

impl ParseResult {
    /// Returns the number of accepted items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when no items were accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Parses a manifest: one entry per line, `URL` optionally followed by
/// whitespace and a suggested filename. Blank lines and `#` comments are
/// ignored. Lines whose first token is not an http(s) URL are skipped.
#[must_use]
pub fn parse_manifest(input: &str) -> ParseResult {
    let mut result = ParseResult::default();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (url_part, name_part) = match line.split_once(char::is_whitespace) {
            Some((url, rest)) => (url, Some(rest.trim())),
            None => (line, None),
        };

        let valid = Url::parse(url_part)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            result.skipped.push(line.to_string());
            continue;
        }

        let suggested = name_part.filter(|n| !n.is_empty()).map(String::from);
        result.items.push(SourceItem {
            url: url_part.to_string(),
            suggested_name: suggested,
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest_url_only() {
        let result = parse_manifest("https://example.com/book.pdf");
        assert_eq!(result.len(), 1);
        assert_eq!(result.items[0].url, "https://example.com/book.pdf");
        assert_eq!(result.items[0].suggested_name, None);
    }

    #[test]
    fn test_parse_manifest_url_with_suggested_name() {
        let result = parse_manifest("https://example.com/a4.pdf  The_Rust_Book.pdf");
        assert_eq!(result.len(), 1);
        assert_eq!(
            result.items[0].suggested_name.as_deref(),
            Some("The_Rust_Book.pdf")
        );
    }

    #[test]
    fn test_parse_manifest_skips_comments_and_blanks() {
        let input = "# curated list\n\nhttps://example.com/one.pdf\n\n# trailing\n";
        let result = parse_manifest(input);
        assert_eq!(result.len(), 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_parse_manifest_collects_invalid_lines() {
        let input = "not-a-url\nftp://example.com/file.pdf\nhttps://example.com/ok.pdf";
        let result = parse_manifest(input);
        assert_eq!(result.len(), 1);
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0], "not-a-url");
    }

    #[test]
    fn test_parse_manifest_preserves_order() {
        let input = "https://a.test/1.pdf\nhttps://b.test/2.pdf\nhttps://c.test/3.pdf";
        let result = parse_manifest(input);
        let urls: Vec<&str> = result.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.test/1.pdf",
                "https://b.test/2.pdf",
                "https://c.test/3.pdf"
            ]
        );
    }

    #[test]
    fn test_parse_manifest_empty_input() {
        let result = parse_manifest("");
        assert!(result.is_empty());
        assert!(result.skipped.is_empty());
    }
}
