//! Three-pass duplicate elimination over the output directory.
//!
//! The passes run cheapest-first:
//! 1. Pre-pass: delete files carrying the filesystem collision-suffix
//!    convention (`book_1.pdf` next to `book.pdf`).
//! 2. Filename pass: sequential first-seen-wins over current filenames;
//!    its survivors seed the filename seen-set guarding the fetch stage.
//! 3. Content pass: bounded-concurrency digest of every remaining file,
//!    keeping exactly one file per digest group.

pub mod hash;

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::download::filename::is_numeric_suffix_duplicate;
use crate::executor::{ExecutorError, run_bounded};

pub use hash::file_digest;

/// Errors from deduplication passes.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    /// Reading or deleting in the output directory failed.
    #[error("IO error in {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The bounded hash pass failed to execute.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Deduplicator bound to one output directory.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    output_dir: PathBuf,
    concurrency: usize,
}

impl Deduplicator {
    /// Creates a deduplicator for `output_dir` with the given admission
    /// bound for the content-hash pass.
    #[must_use]
    pub fn new(output_dir: PathBuf, concurrency: usize) -> Self {
        Self {
            output_dir,
            concurrency,
        }
    }

    /// Lists the regular files currently in the output directory.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError::Io`] if the directory cannot be read.
    pub async fn list_files(&self) -> Result<Vec<PathBuf>, DedupError> {
        let mut entries = tokio::fs::read_dir(&self.output_dir).await.map_err(|e| {
            DedupError::Io {
                path: self.output_dir.clone(),
                source: e,
            }
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| DedupError::Io {
            path: self.output_dir.clone(),
            source: e,
        })? {
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Pre-pass: deletes every file matching the numeric collision-suffix
    /// pattern. Such a file is definitionally a duplicate of the
    /// un-suffixed original. Returns the number of files deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError::Io`] if the directory cannot be scanned;
    /// individual deletion failures are logged and skipped.
    pub async fn remove_suffix_duplicates(&self) -> Result<usize, DedupError> {
        let mut removed = 0usize;
        for path in self.list_files().await? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_numeric_suffix_duplicate(name) {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!(file = name, "removed suffix duplicate");
                    removed += 1;
                }
                Err(e) => warn!(file = name, error = %e, "failed to remove suffix duplicate"),
            }
        }
        Ok(removed)
    }

    /// Filename pass: first-seen-wins reduction over a record sequence.
    ///
    /// Within a single directory the filesystem already enforces name
    /// uniqueness, so this pass materializes as the set of surviving names
    /// used to seed the fetch stage's filename seen-set.
    #[must_use]
    pub fn surviving_filenames(files: &[PathBuf]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut survivors = Vec::new();
        for path in files {
            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && seen.insert(name.to_string())
            {
                survivors.push(name.to_string());
            }
        }
        survivors
    }

    /// Content pass: hashes every file with bounded concurrency, groups by
    /// digest, and keeps exactly one file per group. The survivor is the
    /// lexicographically-first path in the group, so repeated runs make the
    /// same choice. Returns the number of files deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DedupError`] if the directory scan or the bounded hash
    /// pass fails; per-file hash errors are logged and the file is left in
    /// place.
    pub async fn remove_content_duplicates(&self) -> Result<usize, DedupError> {
        let files = self.list_files().await?;
        if files.is_empty() {
            debug!("no files to deduplicate");
            return Ok(0);
        }

        let results = run_bounded(self.concurrency, files, |path| async move {
            let digest = file_digest(&path).await;
            (path, digest)
        })
        .await?;

        let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for (path, digest) in results {
            match digest {
                Ok(digest) => groups.entry(digest).or_default().push(path),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to hash file"),
            }
        }

        let mut removed = 0usize;
        for (digest, mut paths) in groups {
            if paths.len() < 2 {
                continue;
            }
            // Deterministic tie-break: keep the lexicographically-first path.
            paths.sort();
            let keep = paths.remove(0);
            for dup in paths {
                match tokio::fs::remove_file(&dup).await {
                    Ok(()) => {
                        info!(
                            file = %dup.display(),
                            kept = %keep.display(),
                            digest,
                            "removed content duplicate"
                        );
                        removed += 1;
                    }
                    Err(e) => {
                        warn!(file = %dup.display(), error = %e, "failed to remove duplicate");
                    }
                }
            }
        }
        Ok(removed)
    }
}
