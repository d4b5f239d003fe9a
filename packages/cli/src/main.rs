#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for enriching a local prospect list.
//!
//! Reads a CSV file, runs the enrichment pipeline against the lookup
//! service and writes the annotated copy next to the input.
//!
//! Uses `indicatif-log-bridge` (via [`prospektor_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the progress bar never fight for the terminal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use prospektor_cli_utils::IndicatifProgress;
use prospektor_dataset::Dataset;
use prospektor_lookup::SonarClient;
use prospektor_pipeline::{PipelineRun, PipelineSettings, ProgressTracker};
use prospektor_storage::{file_stem, result_key};

#[derive(Parser)]
#[command(name = "prospektor", about = "Phone number enrichment for prospect lists")]
struct Cli {
    /// CSV file to enrich
    input: PathBuf,

    /// Where to write the annotated copy (default: `<stem>_processed.csv`
    /// next to the input)
    #[arg(long)]
    output: Option<PathBuf>,

    /// TOML settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Maximum number of rows enriched at the same time
    #[arg(long)]
    concurrency: Option<usize>,

    /// Burst size of the lookup rate limiter
    #[arg(long)]
    rate_capacity: Option<u32>,

    /// Seconds to fully refill the rate limiter
    #[arg(long)]
    rate_period_secs: Option<f64>,

    /// Seconds before a single row's lookup is abandoned
    #[arg(long)]
    row_timeout_secs: Option<f64>,

    /// Suppress the progress bar
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    /// Settings file values with the command line flags layered on top.
    fn settings(&self) -> Result<PipelineSettings, Box<dyn std::error::Error>> {
        let mut settings = match &self.settings {
            Some(path) => PipelineSettings::from_path(path)?,
            None => PipelineSettings::default(),
        };
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(capacity) = self.rate_capacity {
            settings.rate_capacity = capacity;
        }
        if let Some(period) = self.rate_period_secs {
            settings.rate_period_secs = period;
        }
        if let Some(timeout) = self.row_timeout_secs {
            settings.row_timeout_secs = timeout;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = prospektor_cli_utils::init_logger();
    let cli = Cli::parse();

    let settings = cli.settings()?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input));

    let api_key = std::env::var("PPLX_API_KEY")
        .map_err(|_| "PPLX_API_KEY must be set to your Perplexity API key")?;
    let model = std::env::var("PPLX_MODEL").unwrap_or_else(|_| settings.model.clone());
    let lookup = SonarClient::new(api_key, model)?;

    let dataset = Dataset::from_path(&cli.input)?;
    let run = PipelineRun::new(dataset, settings)?;
    let total = run.total();

    let mut tracker = ProgressTracker::new(total);
    if !cli.quiet {
        tracker = tracker.with_callback(IndicatifProgress::rows_bar(&multi, "Enriching rows"));
    }

    let start = Instant::now();
    log::info!("Enriching {total} row(s) from {}", cli.input.display());

    let enriched = run.execute(Arc::new(lookup), &mut tracker).await?;
    tracker.finish(format!("Enriched {total} row(s)"));
    enriched.write_to_path(&output)?;

    let elapsed = start.elapsed();
    log::info!(
        "Wrote {} in {:.1}s",
        output.display(),
        elapsed.as_secs_f64()
    );

    Ok(())
}

/// `<stem>_processed.csv` next to the input, mirroring the name the
/// server stores results under.
fn default_output(input: &Path) -> PathBuf {
    let filename = input
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("output.csv");
    input.with_file_name(result_key(file_stem(filename)))
}
