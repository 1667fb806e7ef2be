//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use pdfetch_core::Config;

/// Batch download, deduplicate, validate, and rename PDF documents.
///
/// Reads a manifest of URLs (one per line, optionally followed by a
/// suggested filename) from file arguments or stdin and runs the full
/// pipeline against the output directory.
#[derive(Parser, Debug)]
#[command(name = "pdfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Manifest files to read (defaults to stdin when piped)
    pub manifests: Vec<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent downloads (1-1024)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u64).range(1..=1024))]
    pub concurrency: Option<u64>,

    /// Total attempts per download, including the first (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Per-attempt timeout in seconds (1-3600)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Output directory for downloaded files
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip the content-based rename stage
    #[arg(long)]
    pub no_rename: bool,
}

impl Args {
    /// Applies CLI overrides on top of a loaded config.
    #[must_use]
    pub fn merge_into(&self, mut config: Config) -> Config {
        if let Some(concurrency) = self.concurrency {
            #[allow(clippy::cast_possible_truncation)]
            {
                config.concurrency = concurrency as usize;
            }
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.timeout {
            config.attempt_timeout_secs = timeout;
        }
        if let Some(ref output_dir) = self.output_dir {
            config.output_dir.clone_from(output_dir);
        }
        if self.no_rename {
            config.rename_titles = false;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["pdfetch"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.concurrency.is_none());
        assert!(args.manifests.is_empty());
        assert!(!args.no_rename);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["pdfetch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_manifest_positionals() {
        let args = Args::try_parse_from(["pdfetch", "a.txt", "b.txt"]).unwrap();
        assert_eq!(
            args.manifests,
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn test_cli_concurrency_zero_rejected() {
        let result = Args::try_parse_from(["pdfetch", "-c", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_concurrency_over_max_rejected() {
        let result = Args::try_parse_from(["pdfetch", "-c", "1025"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_max_attempts_zero_rejected() {
        // Attempts count the first try, so zero would mean never fetching
        let result = Args::try_parse_from(["pdfetch", "-r", "0"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_merge_overrides_config() {
        let args = Args::try_parse_from([
            "pdfetch",
            "-c",
            "8",
            "-r",
            "5",
            "-t",
            "10",
            "-o",
            "out",
            "--no-rename",
        ])
        .unwrap();
        let config = args.merge_into(Config::default());
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.attempt_timeout_secs, 10);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(!config.rename_titles);
    }

    #[test]
    fn test_cli_merge_keeps_defaults_when_unset() {
        let args = Args::try_parse_from(["pdfetch"]).unwrap();
        let config = args.merge_into(Config::default());
        assert_eq!(config.concurrency, 128);
        assert_eq!(config.max_attempts, 3);
        assert!(config.rename_titles);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["pdfetch", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }
}
