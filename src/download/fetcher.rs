//! Fetch-with-retry: one `SourceItem` in, one `FetchResult` out.
//!
//! Each fetch is an explicit state machine: duplicate checks against the
//! shared seen-sets, then attempt / retryable-failure / wait cycles until
//! success, a permanent failure, or the attempt budget is exhausted.

use std::path::{Path, PathBuf};

use dashmap::DashSet;
use tracing::{debug, info, warn};

use super::client::HttpClient;
use super::error::DownloadError;
use super::filename::derive_filename;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use crate::source::SourceItem;

/// Why an item was skipped without any network attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The URL was already claimed by another fetch in this run.
    DuplicateUrl,
    /// The destination filename already exists (on disk or claimed by a
    /// concurrent fetch).
    DuplicateFilename,
}

impl SkipReason {
    /// Stable label used in logs and summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateUrl => "duplicate-url",
            Self::DuplicateFilename => "duplicate-filename",
        }
    }
}

/// Terminal outcome of fetching one source item.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The document was downloaded to `path`.
    Done {
        /// Destination path of the downloaded file.
        path: PathBuf,
        /// Size of the downloaded body in bytes.
        bytes: u64,
    },
    /// The item was skipped as a duplicate; expected and routine.
    Skipped(SkipReason),
    /// All attempts failed; reported, never fatal to the run.
    Failed {
        /// The last error observed.
        error: DownloadError,
        /// Total attempts consumed.
        attempts: u32,
    },
}

/// Result of one fetch; never mutated after creation.
#[derive(Debug)]
pub struct FetchResult {
    /// The source item this result belongs to.
    pub item: SourceItem,
    /// What happened.
    pub outcome: FetchOutcome,
}

/// Concurrent fetch worker shared by the whole fetch stage.
///
/// The URL and filename seen-sets are `DashSet`s: `insert` is an atomic
/// check-and-insert, so two concurrent fetches for the same key cannot both
/// believe they won it.
#[derive(Debug)]
pub struct Fetcher {
    client: HttpClient,
    policy: RetryPolicy,
    output_dir: PathBuf,
    min_body_bytes: u64,
    seen_urls: DashSet<String>,
    seen_filenames: DashSet<String>,
}

impl Fetcher {
    /// Creates a fetcher writing into `output_dir`.
    #[must_use]
    pub fn new(
        client: HttpClient,
        policy: RetryPolicy,
        output_dir: PathBuf,
        min_body_bytes: u64,
    ) -> Self {
        Self {
            client,
            policy,
            output_dir,
            min_body_bytes,
            seen_urls: DashSet::new(),
            seen_filenames: DashSet::new(),
        }
    }

    /// Seeds the filename seen-set, typically from a scan of the output
    /// directory so files from prior runs are not downloaded again.
    pub fn seed_filenames<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.seen_filenames.insert(name.into());
        }
    }

    /// Fetches one item, applying duplicate checks and the retry policy.
    ///
    /// Side effects: on success the destination file exists on disk; after
    /// an exhausted retry budget any partial file has been removed.
    pub async fn fetch(&self, item: SourceItem) -> FetchResult {
        // Insert-then-check must be atomic: DashSet::insert returns false
        // when another worker already holds the key.
        if !self.seen_urls.insert(item.url.clone()) {
            debug!(url = %item.url, "skipping duplicate URL");
            return FetchResult {
                item,
                outcome: FetchOutcome::Skipped(SkipReason::DuplicateUrl),
            };
        }

        let filename = derive_filename(&item.url, item.suggested_name.as_deref());
        if !self.seen_filenames.insert(filename.clone()) {
            debug!(url = %item.url, filename, "skipping duplicate filename");
            return FetchResult {
                item,
                outcome: FetchOutcome::Skipped(SkipReason::DuplicateFilename),
            };
        }

        let dest = self.output_dir.join(&filename);
        let outcome = self.fetch_with_retry(&item.url, &dest).await;
        if matches!(outcome, FetchOutcome::Failed { .. }) {
            // The name never materialized on disk; release the claim so a
            // different source can still produce this file. The URL claim
            // stays: re-fetching a URL that just exhausted its attempts
            // within the same run would only fail again.
            self.seen_filenames.remove(&filename);
        }
        FetchResult { item, outcome }
    }

    async fn fetch_with_retry(&self, url: &str, dest: &Path) -> FetchOutcome {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(url, attempt, "attempting download");

            match self.fetch_attempt(url, dest).await {
                Ok(bytes) => {
                    info!(url, path = %dest.display(), bytes, "download complete");
                    return FetchOutcome::Done {
                        path: dest.to_path_buf(),
                        bytes,
                    };
                }
                Err(error) => {
                    let failure_type = classify_error(&error);
                    match self.policy.should_retry(failure_type, attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next_attempt,
                        } => {
                            info!(
                                url,
                                attempt = next_attempt,
                                max_attempts = self.policy.max_attempts(),
                                delay_ms = delay.as_millis(),
                                error = %error,
                                "retrying download"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            warn!(url, attempts = attempt, %reason, error = %error, "download failed");
                            // fetch_attempt cleans up after itself, but be
                            // sure nothing partial survives the final failure.
                            let _ = tokio::fs::remove_file(dest).await;
                            return FetchOutcome::Failed { error, attempts: attempt };
                        }
                    }
                }
            }
        }
    }

    /// One attempt: stream to disk, then enforce the minimum body size.
    async fn fetch_attempt(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let bytes = self.client.fetch_to_path(url, dest).await?;
        if bytes < self.min_body_bytes {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(DownloadError::too_small(url, bytes));
        }
        Ok(bytes)
    }
}
