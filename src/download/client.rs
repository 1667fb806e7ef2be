//! HTTP client wrapper for streaming document downloads.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;
use url::Url;

use super::error::DownloadError;

/// HTTP client for downloading files with streaming support.
///
/// Designed to be created once and shared by every fetch worker, taking
/// advantage of connection pooling. The pool is sized to the pipeline's
/// admission bound so the pool itself never becomes a second bottleneck.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new client with the given per-attempt timeout and a
    /// connection pool sized for `concurrency` parallel fetches.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(attempt_timeout: Duration, concurrency: usize) -> Self {
        let client = ClientBuilder::new()
            .timeout(attempt_timeout)
            .connect_timeout(attempt_timeout)
            .pool_max_idle_per_host(concurrency.max(1))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Performs one GET attempt, streaming the response body to `dest`.
    ///
    /// Returns the number of bytes written. On any failure after the file
    /// was created, the partial file is removed before the error is
    /// returned, so a retry always starts from a clean slate.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the URL is invalid, the request fails
    /// (network error, timeout), the server returns a non-success status,
    /// or writing to disk fails.
    pub async fn fetch_to_path(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        // Validate URL before touching the network
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        debug!(url, dest = %dest.display(), "starting attempt");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        let stream_result: Result<(), DownloadError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| {
                    if e.is_timeout() {
                        DownloadError::timeout(url)
                    } else {
                        DownloadError::network(url, e)
                    }
                })?;
                writer
                    .write_all(&chunk)
                    .await
                    .map_err(|e| DownloadError::io(dest, e))?;
                bytes_written += chunk.len() as u64;
            }
            writer.flush().await.map_err(|e| DownloadError::io(dest, e))
        }
        .await;

        if let Err(e) = stream_result {
            debug!(dest = %dest.display(), "removing partial file after stream error");
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }

        debug!(url, bytes = bytes_written, "attempt complete");
        Ok(bytes_written)
    }
}
