//! Structural validation of downloaded files.
//!
//! A file is valid when it meets the minimum size and begins with the
//! configured magic signature. Invalid files are deleted - they are
//! considered worthless - and every deletion is logged.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::executor::{ExecutorError, run_bounded};

/// Default minimum size for a structurally valid file.
pub const DEFAULT_MIN_FILE_SIZE: u64 = 100;

/// Default magic signature for PDF documents.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Bytes read from the head of the file for signature and version checks.
const HEADER_READ_LEN: usize = 1024;

/// Why a file failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// File is below the minimum size.
    TooSmall {
        /// Actual size in bytes.
        size: u64,
    },
    /// File does not begin with the required magic signature.
    BadSignature,
}

impl InvalidReason {
    /// Stable label used in logs and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooSmall { .. } => "too-small",
            Self::BadSignature => "bad-signature",
        }
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Structurally valid; `version` is the parsed format version when the
    /// signature region carried one (diagnostic only).
    Valid {
        /// Format version token, e.g. `1.7`, when parseable.
        version: Option<String>,
    },
    /// Structurally invalid.
    Invalid(InvalidReason),
}

/// Counts from a validation pass over the output directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Files that passed validation.
    pub valid: usize,
    /// Files deleted for being under the size floor.
    pub removed_too_small: usize,
    /// Files deleted for a wrong leading signature.
    pub removed_bad_signature: usize,
}

impl ValidationReport {
    /// Total number of files deleted by the pass.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.removed_too_small + self.removed_bad_signature
    }
}

/// Structural validator: size floor plus magic signature.
#[derive(Debug, Clone)]
pub struct Validator {
    min_size: u64,
    magic: Vec<u8>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FILE_SIZE, PDF_MAGIC.to_vec())
    }
}

impl Validator {
    /// Creates a validator with the given size floor and magic signature.
    #[must_use]
    pub fn new(min_size: u64, magic: Vec<u8>) -> Self {
        Self { min_size, magic }
    }

    /// Classifies one file without side effects.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the file cannot be read.
    pub async fn validate(&self, path: &Path) -> io::Result<Validation> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() < self.min_size {
            return Ok(Validation::Invalid(InvalidReason::TooSmall {
                size: metadata.len(),
            }));
        }

        let mut file = tokio::fs::File::open(path).await?;
        let mut header = vec![0u8; HEADER_READ_LEN.min(metadata.len() as usize)];
        file.read_exact(&mut header).await?;

        if !header.starts_with(&self.magic) {
            return Ok(Validation::Invalid(InvalidReason::BadSignature));
        }

        Ok(Validation::Valid {
            version: parse_version(&header, self.magic.len()),
        })
    }

    /// Validates `files` with bounded concurrency, deleting every invalid
    /// file. A file that cannot be read at all counts as `bad-signature`
    /// and is deleted too.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] if the bounded pass itself fails.
    pub async fn prune_invalid(
        &self,
        files: Vec<PathBuf>,
        concurrency: usize,
    ) -> Result<ValidationReport, ExecutorError> {
        let validator = self.clone();
        let results = run_bounded(concurrency, files, move |path| {
            let validator = validator.clone();
            async move {
                let validation = match validator.validate(&path).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to read file for validation");
                        Validation::Invalid(InvalidReason::BadSignature)
                    }
                };
                (path, validation)
            }
        })
        .await?;

        let mut report = ValidationReport::default();
        for (path, validation) in results {
            match validation {
                Validation::Valid { version } => {
                    debug!(path = %path.display(), ?version, "file is valid");
                    report.valid += 1;
                }
                Validation::Invalid(reason) => {
                    // Intentional data loss: invalid files are worthless,
                    // but every deletion must be observable in the logs.
                    info!(
                        path = %path.display(),
                        reason = reason.as_str(),
                        "deleting invalid file"
                    );
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        warn!(path = %path.display(), error = %e, "failed to delete invalid file");
                    }
                    match reason {
                        InvalidReason::TooSmall { .. } => report.removed_too_small += 1,
                        InvalidReason::BadSignature => report.removed_bad_signature += 1,
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Parses a version token following the magic signature, e.g. the `1.7` in
/// `%PDF-1.7`. A missing or unparseable version is not a failure.
fn parse_version(header: &[u8], magic_len: usize) -> Option<String> {
    let rest = header.get(magic_len..)?;
    let rest = rest.strip_prefix(b"-")?;
    let end = rest
        .iter()
        .position(|b| !(b.is_ascii_digit() || *b == b'.'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    String::from_utf8(rest[..end].to_vec()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A minimal well-formed file: signature plus padding past the floor.
    fn valid_pdf_bytes() -> Vec<u8> {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(256, b' ');
        bytes
    }

    #[tokio::test]
    async fn test_validate_accepts_well_formed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ok.pdf");
        std::fs::write(&path, valid_pdf_bytes()).unwrap();

        let validation = Validator::default().validate(&path).await.unwrap();
        assert_eq!(
            validation,
            Validation::Valid {
                version: Some("1.7".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_validate_missing_version_is_still_valid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("oldstyle.pdf");
        let mut bytes = b"%PDFX".to_vec();
        bytes.resize(200, b'x');
        std::fs::write(&path, bytes).unwrap();

        let validation = Validator::default().validate(&path).await.unwrap();
        assert_eq!(validation, Validation::Valid { version: None });
    }

    #[tokio::test]
    async fn test_validate_rejects_small_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("small.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let validation = Validator::default().validate(&path).await.unwrap();
        assert_eq!(
            validation,
            Validation::Invalid(InvalidReason::TooSmall { size: 8 })
        );
    }

    #[tokio::test]
    async fn test_validate_rejects_wrong_signature() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("html.pdf");
        let mut bytes = b"<html><body>not found</body></html>".to_vec();
        bytes.resize(512, b' ');
        std::fs::write(&path, bytes).unwrap();

        let validation = Validator::default().validate(&path).await.unwrap();
        assert_eq!(validation, Validation::Invalid(InvalidReason::BadSignature));
    }

    #[tokio::test]
    async fn test_prune_invalid_deletes_and_reports() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.pdf");
        let small = temp.path().join("small.pdf");
        let bad = temp.path().join("bad.pdf");
        std::fs::write(&good, valid_pdf_bytes()).unwrap();
        std::fs::write(&small, b"tiny").unwrap();
        let mut html = b"<html>".to_vec();
        html.resize(300, b'x');
        std::fs::write(&bad, html).unwrap();

        let report = Validator::default()
            .prune_invalid(vec![good.clone(), small.clone(), bad.clone()], 4)
            .await
            .unwrap();

        assert_eq!(
            report,
            ValidationReport {
                valid: 1,
                removed_too_small: 1,
                removed_bad_signature: 1
            }
        );
        assert!(good.exists());
        assert!(!small.exists());
        assert!(!bad.exists());
    }

    #[test]
    fn test_parse_version_variants() {
        assert_eq!(parse_version(b"%PDF-1.4\n...", 4), Some("1.4".to_string()));
        assert_eq!(parse_version(b"%PDF-2.0", 4), Some("2.0".to_string()));
        assert_eq!(parse_version(b"%PDFnodash", 4), None);
        assert_eq!(parse_version(b"%PDF-", 4), None);
    }
}
