//! Filename derivation, sanitization, and duplicate-suffix detection.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Default minimum length for a meaningful filename stem.
pub const DEFAULT_MIN_NAME_LEN: usize = 5;

/// Pattern for the filesystem collision-suffix convention: `stem_<digits>.ext`.
///
/// This is an observed convention of the target deployment (a name collision
/// resolved by appending a counter), not a universal filesystem guarantee.
static NUMERIC_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(.+?)_\d+\.([A-Za-z0-9]+)$").unwrap()
});

/// Stems consisting only of digits and underscores carry no information.
static NUMERIC_STEM: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[\d_]+$").unwrap()
});

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) with `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // Reject path-like segments outright
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return "_".to_string();
    }
    sanitized
}

/// Sanitizes an extracted title into a filename stem.
///
/// Beyond [`sanitize_filename`], whitespace runs collapse to a single `_`,
/// repeated separators are folded, and the result is trimmed and truncated
/// to `max_len` characters.
#[must_use]
pub fn sanitize_title(title: &str, max_len: usize) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in title.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    trimmed.chars().take(max_len).collect()
}

/// Derives the destination filename for a source item: the suggested name
/// when present, otherwise the last URL path segment, otherwise a
/// URL-hash fallback. The `.pdf` extension is appended when missing.
#[must_use]
pub fn derive_filename(url: &str, suggested: Option<&str>) -> String {
    let name = match suggested {
        Some(name) if !name.trim().is_empty() => sanitize_filename(name.trim()),
        _ => filename_from_url(url),
    };
    ensure_pdf_extension(&name)
}

/// Extracts a filename from the URL path, or builds a stable fallback from
/// a hash of the URL when the path has no usable last segment.
#[must_use]
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url)
        && let Some(last) = parsed.path_segments().and_then(|mut s| s.next_back())
        && last.len() >= 5
        && last != ".pdf"
    {
        return sanitize_filename(last);
    }

    // Stable per-URL fallback, mirroring the discovery convention.
    let digest = md5::compute(url.as_bytes());
    format!("pdf_{:x}", digest)[..12].to_string()
}

fn ensure_pdf_extension(name: &str) -> String {
    if name.to_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

/// Returns true when `filename` matches the numeric collision-suffix
/// pattern (`stem_<digits>.ext`) and is therefore a filesystem-assigned
/// duplicate of the un-suffixed original.
#[must_use]
pub fn is_numeric_suffix_duplicate(filename: &str) -> bool {
    NUMERIC_SUFFIX.is_match(filename)
}

/// Returns true when the filename stem is too low-information to keep:
/// shorter than `min_len`, purely numeric, or a generic placeholder.
#[must_use]
pub fn is_low_information_stem(stem: &str, min_len: usize) -> bool {
    if stem.chars().count() < min_len {
        return true;
    }
    if NUMERIC_STEM.is_match(stem) {
        return true;
    }
    let lower = stem.to_lowercase();
    lower.starts_with("pdf_") || lower.starts_with("book") || lower == "index" || lower == "document"
}
