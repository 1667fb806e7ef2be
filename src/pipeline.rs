//! Stage orchestration for the full batch pipeline.
//!
//! Stages run with strict barriers between them: suffix pre-pass, seed
//! filename set, fetch, content dedup, validation, rename. Per-item
//! failures are result values reported in the summary; only environment
//! failures (an unusable output directory) abort the run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Config;
use crate::dedup::{DedupError, Deduplicator};
use crate::download::{Fetcher, FetchOutcome, HttpClient, RetryPolicy, SkipReason};
use crate::executor::{ExecutorError, run_bounded};
use crate::rename::Renamer;
use crate::rename::title::{NoopExtractor, PdfMetadataExtractor, TitleExtractor};
use crate::source::SourceItem;
use crate::validate::Validator;

/// Errors that abort the pipeline. Per-item download failures never do.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The output directory could not be created or accessed.
    #[error("cannot use output directory '{path}': {source}")]
    OutputDir {
        /// The directory that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A deduplication pass failed at the directory level.
    #[error(transparent)]
    Dedup(#[from] DedupError),

    /// A bounded stage failed to execute.
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// End-of-run accounting, logged and returned to the caller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Items downloaded to disk.
    pub downloaded: usize,
    /// Items skipped because the URL was already claimed this run.
    pub skipped_duplicate_url: usize,
    /// Items skipped because the destination filename was taken.
    pub skipped_duplicate_filename: usize,
    /// Items that exhausted their attempt budget or failed permanently.
    pub failed: usize,
    /// Files deleted by the numeric-suffix pre-pass.
    pub suffix_duplicates_removed: usize,
    /// Files deleted by the content-hash pass.
    pub content_duplicates_removed: usize,
    /// Files deleted by structural validation.
    pub invalid_removed: usize,
    /// Files renamed to an extracted title.
    pub renamed: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Orchestrates the full download / dedup / validate / rename pipeline.
pub struct Pipeline {
    config: Config,
    extractor: Arc<dyn TitleExtractor>,
}

impl Pipeline {
    /// Creates a pipeline from configuration, selecting the title
    /// extractor according to `rename_titles`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let extractor: Arc<dyn TitleExtractor> = if config.rename_titles {
            Arc::new(PdfMetadataExtractor)
        } else {
            Arc::new(NoopExtractor)
        };
        Self { config, extractor }
    }

    /// Overrides the title extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn TitleExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Runs every stage against `items` and returns the summary.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for environment failures; items that
    /// fail to download are counted in the summary instead.
    pub async fn run(&self, items: Vec<SourceItem>) -> Result<PipelineSummary, PipelineError> {
        let started = Instant::now();
        let mut summary = PipelineSummary::default();

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| PipelineError::OutputDir {
                path: self.config.output_dir.clone(),
                source: e,
            })?;

        let dedup = Deduplicator::new(self.config.output_dir.clone(), self.config.concurrency);

        // Stage 1: numeric-suffix pre-pass over whatever is already on disk
        summary.suffix_duplicates_removed = dedup.remove_suffix_duplicates().await?;

        // Stage 2: fetch, seeded with the filenames that survived the pre-pass
        let fetcher = Arc::new(Fetcher::new(
            HttpClient::new(self.config.attempt_timeout(), self.config.concurrency),
            RetryPolicy::new(self.config.max_attempts, self.config.backoff_base()),
            self.config.output_dir.clone(),
            self.config.min_file_size,
        ));
        let existing = dedup.list_files().await?;
        fetcher.seed_filenames(Deduplicator::surviving_filenames(&existing));

        info!(
            items = items.len(),
            concurrency = self.config.concurrency,
            output_dir = %self.config.output_dir.display(),
            "starting fetch stage"
        );

        let progress = fetch_progress_bar(items.len() as u64);
        let fetch_worker = Arc::clone(&fetcher);
        let fetch_progress = progress.clone();
        let results = run_bounded(self.config.concurrency, items, move |item| {
            let fetcher = Arc::clone(&fetch_worker);
            let progress = fetch_progress.clone();
            async move {
                let result = fetcher.fetch(item).await;
                progress.inc(1);
                result
            }
        })
        .await?;
        progress.finish_and_clear();

        for result in &results {
            match &result.outcome {
                FetchOutcome::Done { .. } => summary.downloaded += 1,
                FetchOutcome::Skipped(SkipReason::DuplicateUrl) => {
                    summary.skipped_duplicate_url += 1;
                }
                FetchOutcome::Skipped(SkipReason::DuplicateFilename) => {
                    summary.skipped_duplicate_filename += 1;
                }
                FetchOutcome::Failed { error, attempts } => {
                    warn!(url = %result.item.url, attempts, error = %error, "download failed");
                    summary.failed += 1;
                }
            }
        }

        // Stage 3: content-hash dedup over the whole directory
        summary.content_duplicates_removed = dedup.remove_content_duplicates().await?;

        // Stage 4: structural validation, pruning invalid files
        let validator = Validator::new(self.config.min_file_size, self.config.magic.clone().into_bytes());
        let report = validator
            .prune_invalid(dedup.list_files().await?, self.config.concurrency)
            .await?;
        summary.invalid_removed = report.removed();

        // Stage 5: content-based rename
        if self.config.rename_titles {
            let renamer = Renamer::new(Arc::clone(&self.extractor))
                .with_min_name_len(self.config.min_name_len)
                .with_max_name_len(self.config.max_name_len);
            let rename_report = renamer
                .rename_all(dedup.list_files().await?, self.config.concurrency)
                .await?;
            summary.renamed = rename_report.renamed;
        } else {
            warn!("rename stage disabled, keeping downloaded filenames");
        }

        summary.elapsed = started.elapsed();
        info!(
            downloaded = summary.downloaded,
            skipped_duplicate_url = summary.skipped_duplicate_url,
            skipped_duplicate_filename = summary.skipped_duplicate_filename,
            failed = summary.failed,
            suffix_duplicates_removed = summary.suffix_duplicates_removed,
            content_duplicates_removed = summary.content_duplicates_removed,
            invalid_removed = summary.invalid_removed,
            renamed = summary.renamed,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "pipeline complete"
        );
        Ok(summary)
    }
}

fn fetch_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pdf_body(extra: &str) -> Vec<u8> {
        let mut body = format!("%PDF-1.4\n{extra}\n").into_bytes();
        body.resize(256, b' ');
        body
    }

    fn test_config(output_dir: &std::path::Path) -> Config {
        Config {
            concurrency: 4,
            backoff_base_secs: 0,
            output_dir: output_dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_run_counts_downloads_and_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/good-document.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body("good")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing-document.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(temp.path()));
        let summary = pipeline
            .run(vec![
                SourceItem::new(format!("{}/good-document.pdf", server.uri())),
                SourceItem::new(format!("{}/missing-document.pdf", server.uri())),
            ])
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
        assert!(temp.path().join("good-document.pdf").exists());
    }

    #[tokio::test]
    async fn test_run_is_idempotent_for_same_input() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stable-document.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf_body("stable")))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let items = || vec![SourceItem::new(format!("{}/stable-document.pdf", server.uri()))];

        let pipeline = Pipeline::new(test_config(temp.path()));
        let first = pipeline.run(items()).await.unwrap();
        assert_eq!(first.downloaded, 1);

        // Second run: filename already on disk, so the fetch is skipped
        let pipeline = Pipeline::new(test_config(temp.path()));
        let second = pipeline.run(items()).await.unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped_duplicate_filename, 1);
        assert_eq!(
            std::fs::read_dir(temp.path()).unwrap().count(),
            1,
            "repeated runs must not add files"
        );
    }

    #[tokio::test]
    async fn test_run_removes_invalid_downloads() {
        let server = MockServer::start().await;
        let mut html = b"<html>not a pdf, long enough to pass the size floor".to_vec();
        html.resize(300, b'x');
        Mock::given(method("GET"))
            .and(path("/fake-document.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(html))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let pipeline = Pipeline::new(test_config(temp.path()));
        let summary = pipeline
            .run(vec![SourceItem::new(format!(
                "{}/fake-document.pdf",
                server.uri()
            ))])
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.invalid_removed, 1);
        assert!(!temp.path().join("fake-document.pdf").exists());
    }

    #[tokio::test]
    async fn test_run_fails_on_unusable_output_dir() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("blocker");
        std::fs::write(&file_path, b"x").unwrap();

        // A regular file where the output directory should be
        let pipeline = Pipeline::new(test_config(&file_path));
        let result = pipeline.run(vec![]).await;
        assert!(matches!(result, Err(PipelineError::OutputDir { .. })));
    }
}
