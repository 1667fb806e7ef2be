//! Content-based renaming of low-information filenames.
//!
//! A filename like `000005113.pdf` or `pdf_3021.pdf` tells the reader
//! nothing. This pass extracts a title from the document itself and renames
//! the file to a sanitized form of it, leaving well-named files untouched.

pub mod title;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, info, warn};

use crate::download::filename::{DEFAULT_MIN_NAME_LEN, is_low_information_stem, sanitize_title};
use crate::executor::{ExecutorError, run_bounded};
use title::TitleExtractor;

/// Default maximum length for a generated filename stem.
pub const DEFAULT_MAX_NAME_LEN: usize = 200;

/// Outcome of the rename decision for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The file was renamed.
    Renamed {
        /// Original path.
        from: PathBuf,
        /// New path.
        to: PathBuf,
    },
    /// The existing name was informative enough to keep.
    KeptOriginal,
    /// The name was poor but no usable title could be extracted.
    NoTitle,
}

/// Counts from a rename pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameReport {
    /// Files renamed to an extracted title.
    pub renamed: usize,
    /// Files whose original name was kept.
    pub kept: usize,
    /// Poorly-named files with no extractable title.
    pub no_title: usize,
}

/// Renames poorly-named files using a pluggable title extractor.
///
/// Target names are claimed in a shared `DashSet` before the filesystem
/// rename, so concurrent workers deriving the same title can never resolve
/// the same path and clobber each other.
#[derive(Debug, Clone)]
pub struct Renamer {
    extractor: Arc<dyn TitleExtractor>,
    min_name_len: usize,
    max_name_len: usize,
    claimed: Arc<DashSet<String>>,
}

impl Default for Renamer {
    fn default() -> Self {
        Self::new(Arc::new(title::PdfMetadataExtractor))
    }
}

impl Renamer {
    /// Creates a renamer with default name-length thresholds.
    #[must_use]
    pub fn new(extractor: Arc<dyn TitleExtractor>) -> Self {
        Self {
            extractor,
            min_name_len: DEFAULT_MIN_NAME_LEN,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            claimed: Arc::new(DashSet::new()),
        }
    }

    /// Overrides the minimum stem length below which a name is considered
    /// low-information.
    #[must_use]
    pub fn with_min_name_len(mut self, min_name_len: usize) -> Self {
        self.min_name_len = min_name_len;
        self
    }

    /// Overrides the maximum length of a generated stem.
    #[must_use]
    pub fn with_max_name_len(mut self, max_name_len: usize) -> Self {
        self.max_name_len = max_name_len;
        self
    }

    /// Returns true when the file's stem is too low-information to keep.
    #[must_use]
    pub fn needs_rename(&self, path: &Path) -> bool {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return false;
        };
        is_low_information_stem(stem, self.min_name_len)
    }

    /// Decides and applies the rename for one file.
    ///
    /// Title extraction is synchronous IO, so it runs on a blocking thread.
    /// Name collisions in the target directory resolve with a numeric
    /// counter rather than overwriting.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the filesystem rename fails. An
    /// extraction failure is not an error, it yields [`RenameOutcome::NoTitle`].
    pub async fn rename_file(&self, path: &Path) -> std::io::Result<RenameOutcome> {
        if !self.needs_rename(path) {
            return Ok(RenameOutcome::KeptOriginal);
        }

        let extractor = Arc::clone(&self.extractor);
        let extract_path = path.to_path_buf();
        let title = tokio::task::spawn_blocking(move || extractor.extract_title(&extract_path))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "title extraction task failed");
                None
            });

        let Some(title) = title else {
            debug!(path = %path.display(), extractor = self.extractor.name(), "no usable title");
            return Ok(RenameOutcome::NoTitle);
        };

        let stem = sanitize_title(&title, self.max_name_len);
        if stem.is_empty() || is_low_information_stem(&stem, self.min_name_len) {
            return Ok(RenameOutcome::NoTitle);
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("pdf");
        let target = self.claim_unique_path(dir, &stem, ext);

        tokio::fs::rename(path, &target).await?;
        info!(from = %path.display(), to = %target.display(), "renamed file");
        Ok(RenameOutcome::Renamed {
            from: path.to_path_buf(),
            to: target,
        })
    }

    /// Claims the first free target name for `stem`, appending `_2`, `_3`,
    /// ... on collision. `DashSet::insert` is the atomic check-and-insert:
    /// once a worker holds a name, no peer can resolve the same path, so a
    /// rename never replaces a file another worker just produced. The disk
    /// check covers files that predate this pass.
    fn claim_unique_path(&self, dir: &Path, stem: &str, ext: &str) -> PathBuf {
        for i in 1..1000u32 {
            let name = if i == 1 {
                format!("{stem}.{ext}")
            } else {
                format!("{stem}_{i}.{ext}")
            };
            let candidate = dir.join(&name);
            if self.claimed.insert(name) && !candidate.exists() {
                return candidate;
            }
        }

        // Fallback (extremely unlikely)
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        dir.join(format!("{stem}_{timestamp}.{ext}"))
    }

    /// Runs the rename decision over `files` with bounded concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] if the bounded pass itself fails; per-file
    /// rename errors are logged and counted as kept.
    pub async fn rename_all(
        &self,
        files: Vec<PathBuf>,
        concurrency: usize,
    ) -> Result<RenameReport, ExecutorError> {
        let renamer = self.clone();
        let results = run_bounded(concurrency, files, move |path| {
            let renamer = renamer.clone();
            async move {
                let outcome = renamer.rename_file(&path).await;
                (path, outcome)
            }
        })
        .await?;

        let mut report = RenameReport::default();
        for (path, outcome) in results {
            match outcome {
                Ok(RenameOutcome::Renamed { .. }) => report.renamed += 1,
                Ok(RenameOutcome::KeptOriginal) => report.kept += 1,
                Ok(RenameOutcome::NoTitle) => report.no_title += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "rename failed");
                    report.kept += 1;
                }
            }
        }
        Ok(report)
    }
}
