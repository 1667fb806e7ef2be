//! HTTP download stage: client, retry policy, filenames, and the fetcher.
//!
//! The fetch path is an explicit state machine per item: check the URL and
//! filename seen-sets, then attempt the request; a retryable failure waits
//! out the backoff schedule and re-attempts, a permanent failure or
//! exhausted budget yields a final `Failed` result.

mod client;
mod error;
mod fetcher;
pub mod filename;
mod retry;

pub use client::HttpClient;
pub use error::DownloadError;
pub use fetcher::{FetchOutcome, FetchResult, Fetcher, SkipReason};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};

/// Default per-attempt timeout in seconds.
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Default maximum attempts per item (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A response body below this size is too small to be a valid document.
pub const DEFAULT_MIN_BODY_BYTES: u64 = 100;
