//! CLI entry point for the pdfetch pipeline.

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};
use clap::Parser;
use pdfetch_core::{Config, Pipeline, parse_manifest};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // Read input: from manifest files or stdin
    let input_text = if args.manifests.is_empty() {
        if io::stdin().is_terminal() {
            info!("No input provided. Pipe a manifest via stdin or pass manifest files.");
            info!("Example: echo 'https://example.com/file.pdf' | pdfetch");
            return Ok(());
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        let mut buffer = String::new();
        for path in &args.manifests {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read manifest '{}'", path.display()))?;
            buffer.push_str(&text);
            buffer.push('\n');
        }
        buffer
    };

    let parse_result = parse_manifest(&input_text);
    for skipped in &parse_result.skipped {
        warn!(line = %skipped, "skipped unrecognized manifest line");
    }
    if parse_result.is_empty() {
        info!("No valid URLs found in input");
        return Ok(());
    }
    info!(
        items = parse_result.len(),
        skipped = parse_result.skipped.len(),
        "parsed manifest"
    );

    // Load config file (if any), then apply CLI overrides
    let base = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let config = args.merge_into(base);
    config.validate()?;

    let summary = Pipeline::new(config).run(parse_result.items).await?;

    info!(
        downloaded = summary.downloaded,
        failed = summary.failed,
        renamed = summary.renamed,
        "done"
    );

    // Per-item failures are reported above; only environment errors
    // (already propagated) make the process exit non-zero.
    Ok(())
}
