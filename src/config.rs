//! Runtime configuration with TOML file support.
//!
//! Precedence: CLI flags override file values, file values override
//! built-in defaults. The file is only read when `--config` names one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::download::{DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_BODY_BYTES};
use crate::download::filename::DEFAULT_MIN_NAME_LEN;
use crate::executor::DEFAULT_CONCURRENCY;
use crate::rename::DEFAULT_MAX_NAME_LEN;

/// Default output directory for downloaded files.
pub const DEFAULT_OUTPUT_DIR: &str = "downloaded_pdfs";

/// Errors from loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or carries invalid values.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range.
    #[error("invalid config value for `{field}`: {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: u64,
    },
}

/// Full pipeline configuration with built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Maximum in-flight work items per bounded stage.
    pub concurrency: usize,
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    /// Linear backoff base in seconds (wait `attempt x base` between tries).
    pub backoff_base_secs: u64,
    /// Per-attempt HTTP timeout in seconds.
    pub attempt_timeout_secs: u64,
    /// Minimum byte size of a structurally valid file.
    pub min_file_size: u64,
    /// Leading magic signature a valid file must carry.
    pub magic: String,
    /// Minimum length of a meaningful filename stem.
    pub min_name_len: usize,
    /// Maximum length of a generated filename stem.
    pub max_name_len: usize,
    /// Directory that receives downloaded files.
    pub output_dir: PathBuf,
    /// Whether the content-based rename stage runs.
    pub rename_titles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_secs: 1,
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            min_file_size: DEFAULT_MIN_BODY_BYTES,
            magic: "%PDF".to_string(),
            min_name_len: DEFAULT_MIN_NAME_LEN,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            rename_titles: true,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// carries out-of-range values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for any value outside its
    /// accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::OutOfRange {
                field: "concurrency",
                value: 0,
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_attempts",
                value: 0,
            });
        }
        if !(1..=3600).contains(&self.attempt_timeout_secs) {
            return Err(ConfigError::OutOfRange {
                field: "attempt_timeout_secs",
                value: self.attempt_timeout_secs,
            });
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_name_len",
                value: 0,
            });
        }
        Ok(())
    }

    /// Per-attempt timeout as a [`Duration`].
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Linear backoff base as a [`Duration`].
    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }
}
