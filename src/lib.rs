//! Pdfetch Core Library
//!
//! This library implements a bounded-concurrency batch pipeline that
//! downloads, deduplicates, validates, and renames large collections of
//! PDF documents gathered from many remote sources.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`executor`] - Generic "run N work items, at most K in flight" primitive
//! - [`download`] - HTTP fetcher with timeout, retry, and backoff
//! - [`dedup`] - Three-pass duplicate elimination (suffix, filename, content)
//! - [`validate`] - Structural validation of downloaded files
//! - [`rename`] - Content-based renaming with a pluggable title extractor
//! - [`pipeline`] - Stage orchestration with strict barriers between stages
//! - [`source`] - Manifest parsing at the discovery boundary
//! - [`config`] - Runtime configuration with TOML file support

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dedup;
pub mod download;
pub mod executor;
pub mod pipeline;
pub mod rename;
pub mod source;
pub mod validate;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use dedup::{DedupError, Deduplicator};
pub use download::{
    DownloadError, FailureType, FetchOutcome, FetchResult, Fetcher, HttpClient, RetryDecision,
    RetryPolicy, SkipReason, classify_error,
};
pub use executor::{DEFAULT_CONCURRENCY, ExecutorError, run_bounded};
pub use pipeline::{Pipeline, PipelineError, PipelineSummary};
pub use rename::{RenameOutcome, RenameReport, Renamer, title::TitleExtractor};
pub use source::{ParseResult, SourceItem, parse_manifest};
pub use validate::{InvalidReason, Validation, ValidationReport, Validator};
