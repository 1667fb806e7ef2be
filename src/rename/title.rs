//! Title extraction from PDF bytes.
//!
//! The extractor is deliberately shallow: it scans the raw bytes for a
//! `/Title` metadata entry instead of parsing the document structure. That
//! covers the overwhelming majority of real-world files while staying
//! dependency-free, and the trait seam allows a full parser to be plugged
//! in later without touching the renamer.

use std::fmt::Debug;
use std::path::Path;

use tracing::debug;

/// How many bytes of the file are scanned for metadata and text.
const SCAN_LEN: usize = 64 * 1024;

/// Minimum plausible title length, in characters.
const MIN_TITLE_LEN: usize = 10;

/// Maximum plausible title length, in characters.
const MAX_TITLE_LEN: usize = 150;

/// Capability seam for extracting a document title from a file on disk.
///
/// Implementations run on a blocking thread; they are free to do
/// synchronous IO.
pub trait TitleExtractor: Send + Sync + Debug {
    /// Returns the document title, or `None` when the file carries none
    /// that passes the plausibility checks.
    fn extract_title(&self, path: &Path) -> Option<String>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Extractor that never finds a title. Used when renaming is disabled at
/// the extraction level but the pass itself should still run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExtractor;

impl TitleExtractor for NoopExtractor {
    fn extract_title(&self, _path: &Path) -> Option<String> {
        None
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Default extractor: scans the head of the file for a `/Title` metadata
/// entry, falling back to a heuristic over visible text runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfMetadataExtractor;

impl TitleExtractor for PdfMetadataExtractor {
    fn extract_title(&self, path: &Path) -> Option<String> {
        let bytes = read_head(path)?;

        if let Some(title) = title_from_metadata(&bytes) {
            debug!(path = %path.display(), title, "title from metadata");
            return Some(title);
        }
        if let Some(title) = title_from_text_head(&bytes) {
            debug!(path = %path.display(), title, "title from text heuristic");
            return Some(title);
        }
        None
    }

    fn name(&self) -> &'static str {
        "pdf-metadata"
    }
}

fn read_head(path: &Path) -> Option<Vec<u8>> {
    use std::io::Read;
    let mut file = std::fs::File::open(path).ok()?;
    let mut buf = vec![0u8; SCAN_LEN];
    let mut filled = 0;
    loop {
        let n = file.read(&mut buf[filled..]).ok()?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    buf.truncate(filled);
    Some(buf)
}

/// Scans for the last `/Title` entry in the buffer. Later entries override
/// earlier ones in incrementally-updated documents.
fn title_from_metadata(bytes: &[u8]) -> Option<String> {
    let needle = b"/Title";
    let mut best = None;
    let mut from = 0;
    while let Some(pos) = find(bytes, needle, from) {
        if let Some(title) = parse_title_value(&bytes[pos + needle.len()..]) {
            best = Some(title);
        }
        from = pos + needle.len();
    }
    best.filter(|t| plausible_title(t))
}

/// Parses the value after a `/Title` key: a literal string `(...)` with
/// escape sequences and balanced nesting, or a hex string `<...>`.
fn parse_title_value(rest: &[u8]) -> Option<String> {
    let mut i = 0;
    while i < rest.len() && (rest[i] == b' ' || rest[i] == b'\r' || rest[i] == b'\n') {
        i += 1;
    }
    match rest.get(i)? {
        b'(' => parse_literal_string(&rest[i + 1..]),
        b'<' => parse_hex_string(&rest[i + 1..]),
        _ => None,
    }
}

fn parse_literal_string(bytes: &[u8]) -> Option<String> {
    let mut out = Vec::new();
    let mut depth = 1u32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let next = *bytes.get(i + 1)?;
                if matches!(next, b'0'..=b'7') {
                    // Octal escape: 1 to 3 digits, value taken modulo 256
                    let mut value = 0u16;
                    let mut digits = 0;
                    while digits < 3 {
                        let Some(&d) = bytes.get(i + 1 + digits) else {
                            break;
                        };
                        if !matches!(d, b'0'..=b'7') {
                            break;
                        }
                        value = value * 8 + u16::from(d - b'0');
                        digits += 1;
                    }
                    out.push(u8::try_from(value & 0xFF).unwrap_or(0));
                    i += 1 + digits;
                } else {
                    match next {
                        b'n' | b'r' | b't' => out.push(b' '),
                        b'(' | b')' | b'\\' => out.push(next),
                        // Anything else: keep the raw byte
                        _ => out.push(next),
                    }
                    i += 2;
                }
            }
            b'(' => {
                depth += 1;
                out.push(b'(');
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return decode_string_bytes(&out);
                }
                out.push(b')');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    None
}

fn parse_hex_string(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|b| *b == b'>')?;
    let mut raw = Vec::new();
    let mut hi: Option<u8> = None;
    for b in &bytes[..end] {
        let Some(digit) = (*b as char).to_digit(16) else {
            continue;
        };
        #[allow(clippy::cast_possible_truncation)]
        let digit = digit as u8;
        match hi {
            None => hi = Some(digit),
            Some(h) => {
                raw.push((h << 4) | digit);
                hi = None;
            }
        }
    }
    if let Some(h) = hi {
        raw.push(h << 4);
    }
    decode_string_bytes(&raw)
}

/// Decodes string bytes: UTF-16BE when the BOM is present, otherwise
/// treated as Latin-1-ish single bytes.
fn decode_string_bytes(raw: &[u8]) -> Option<String> {
    let s = if raw.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        raw.iter().map(|&b| b as char).collect()
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Heuristic fallback: the first plausible run of printable text in the
/// scanned head. Works for documents whose producers left the metadata
/// empty but start with a visible title line.
fn title_from_text_head(bytes: &[u8]) -> Option<String> {
    let mut run = String::new();
    for &b in bytes {
        if (0x20..0x7F).contains(&b) {
            run.push(b as char);
        } else {
            if let Some(title) = plausible_run(&run) {
                return Some(title);
            }
            run.clear();
        }
    }
    plausible_run(&run)
}

fn plausible_run(run: &str) -> Option<String> {
    let candidate = run.trim();
    // Structural PDF tokens are printable too; skip anything that looks
    // like syntax rather than prose.
    if candidate.contains('%')
        || candidate.contains('/')
        || candidate.contains('<')
        || candidate.contains("obj")
    {
        return None;
    }
    if plausible_title(candidate) {
        Some(candidate.to_string())
    } else {
        None
    }
}

fn plausible_title(candidate: &str) -> bool {
    let len = candidate.chars().count();
    if !(MIN_TITLE_LEN..=MAX_TITLE_LEN).contains(&len) {
        return false;
    }
    if candidate.split_whitespace().count() < 2 {
        return false;
    }
    // A title needs letters, not just digits and punctuation
    candidate.chars().any(char::is_alphabetic)
}

/// Finds `needle` in `haystack` starting at `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
