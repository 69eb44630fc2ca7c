//! Media-Harvest main entry point
//!
//! This is the command-line interface for the Media-Harvest batch extractor.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use media_harvest::config::{load_run_config, Config};
use media_harvest::fetcher::HttpPageFetcher;
use media_harvest::output::{evaluate_run, EvaluationReport, RunOutput};
use media_harvest::pipeline::{load_candidates, plan_batch, run_extraction, BatchPlan};
use media_harvest::state::{load_checkpoint, save_checkpoint, BatchProgressState, CheckpointFile};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Media-Harvest: a resumable metadata harvester
///
/// Media-Harvest extracts structured metadata from media catalog pages in
/// independently invoked batches, writing Parquet artifacts and reporting where the
/// next batch should resume. The evaluate command validates the artifacts of a run.
#[derive(Parser, Debug)]
#[command(name = "media-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable metadata harvester for media catalog pages", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write logs to this file (appended)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one batch of candidate URLs
    Extract(ExtractArgs),

    /// Validate the artifacts of a run and report a verdict
    Evaluate(EvaluateArgs),
}

#[derive(clap::Args, Debug)]
struct ExtractArgs {
    /// Candidate JSON file (array of objects with a `url` key)
    #[arg(long, default_value = "data/candidates.json")]
    input: PathBuf,

    /// Directory receiving the Parquet and skipped-record artifacts
    #[arg(long)]
    output_dir: PathBuf,

    /// Maximum records processed by this invocation
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    max_records: u64,

    /// Index into the candidate sequence where this batch starts
    #[arg(long, default_value_t = 0)]
    start_index: usize,

    /// Records processed by previous batches
    #[arg(long, default_value_t = 0)]
    total_processed: usize,

    /// Records the whole run should process (0 = all candidates)
    #[arg(long, default_value_t = 0)]
    total_target: usize,

    /// File receiving key=value run output for the orchestrator
    #[arg(long, value_name = "PATH")]
    output_file: Option<PathBuf>,

    /// Checkpoint file read before and written after the batch
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,

    /// Show the planned slice without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args, Debug)]
struct EvaluateArgs {
    /// Directory searched recursively for Parquet artifacts
    #[arg(long)]
    artifacts_dir: PathBuf,

    /// File receiving key=value run output for the orchestrator
    #[arg(long, value_name = "PATH")]
    output_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let (config, config_hash) =
        load_run_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Extract(args) if args.dry_run => handle_dry_run(&config, &args),
        Command::Extract(args) => handle_extract(config, config_hash, args).await,
        Command::Evaluate(args) => handle_evaluate(&config, args),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file, a second ANSI-free layer appends the same events to it.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("media_harvest=info,warn"),
            1 => EnvFilter::new("media_harvest=debug,info"),
            2 => EnvFilter::new("media_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Resolves the progress state from the checkpoint file or the command line
fn resolve_progress(args: &ExtractArgs, config_hash: Option<&str>) -> Result<BatchProgressState> {
    let from_cli =
        BatchProgressState::new(args.start_index, args.total_processed, args.total_target);

    let Some(state_file) = &args.state_file else {
        return Ok(from_cli);
    };

    let checkpoint = load_checkpoint(state_file)
        .with_context(|| format!("Failed to read state file {}", state_file.display()))?;

    match checkpoint {
        Some(checkpoint) => {
            tracing::info!(
                "Resuming from {} (start index {}, {} processed); command-line progress ignored",
                state_file.display(),
                checkpoint.state.start_index,
                checkpoint.state.total_processed
            );
            if let (Some(stored), Some(current)) = (&checkpoint.config_hash, config_hash) {
                if stored != current {
                    tracing::warn!(
                        "Configuration changed since the last batch (was {}, now {})",
                        stored,
                        current
                    );
                }
            }
            Ok(checkpoint.state)
        }
        None => {
            tracing::info!(
                "No checkpoint at {}, starting from command-line progress",
                state_file.display()
            );
            Ok(from_cli)
        }
    }
}

/// Handles `extract --dry-run`: shows the planned slice without fetching
fn handle_dry_run(config: &Config, args: &ExtractArgs) -> Result<ExitCode> {
    let candidates = load_candidates(&args.input)
        .with_context(|| format!("Failed to load candidates from {}", args.input.display()))?;
    let progress = resolve_progress(args, None)?;

    println!("=== Media-Harvest Dry Run ===\n");

    println!("Retry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Record deadline: {:?}", config.retry.record_deadline());
    println!("  Backoff: {:?}", config.retry.backoff());
    println!("  Retry categorical failures: {}", config.retry.retry_categorical);

    println!("\nDetection:");
    println!("  Title marker: {}", config.site.title_marker);
    println!("  Title timeout: {:?}", config.detection.title_timeout());
    println!("  Content timeout: {:?}", config.detection.content_timeout());
    println!("  Layout timeout: {:?}", config.detection.layout_timeout());
    println!("  Field timeout: {:?}", config.detection.field_timeout());
    println!(
        "  Extraction timeout: {:?}",
        config.detection.extraction_timeout()
    );

    println!("\nOutput:");
    println!("  Directory: {}", args.output_dir.display());
    println!("  Flush every: {} records", config.output.flush_every);

    println!("\nCandidates: {} ({})", candidates.len(), args.input.display());
    println!(
        "Progress: start index {}, {} processed, target {}",
        progress.start_index,
        progress.total_processed,
        progress.effective_target(candidates.len())
    );

    println!();
    match plan_batch(candidates.len(), &progress, args.max_records as usize) {
        BatchPlan::Complete {
            total_processed,
            target,
        } => {
            println!(
                "✓ Target already met ({} of {}), nothing to process",
                total_processed, target
            );
        }
        BatchPlan::Slice(slice) => {
            println!("✓ Configuration is valid");
            println!(
                "✓ Would process {} records (indices {}..{})",
                slice.len(),
                slice.start_index,
                slice.end_index
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Handles the extraction of one batch
async fn handle_extract(
    config: Config,
    config_hash: Option<String>,
    args: ExtractArgs,
) -> Result<ExitCode> {
    let candidates = load_candidates(&args.input)
        .with_context(|| format!("Failed to load candidates from {}", args.input.display()))?;
    let progress = resolve_progress(&args, config_hash.as_deref())?;

    let fetcher = HttpPageFetcher::new(config.fetcher.clone());
    let report = run_extraction(
        fetcher,
        &config,
        &candidates,
        progress,
        args.max_records as usize,
        &args.output_dir,
    )
    .await
    .context("Batch extraction failed")?;

    if let Some(state_file) = &args.state_file {
        let checkpoint = CheckpointFile {
            state: report.next_state(progress.total_target),
            config_hash,
            updated_at: Utc::now(),
        };
        save_checkpoint(state_file, &checkpoint)
            .with_context(|| format!("Failed to write state file {}", state_file.display()))?;
    }

    let mut output = RunOutput::new(args.output_file.as_deref());
    report.write_to(&mut output);
    output.write();

    Ok(ExitCode::SUCCESS)
}

/// Handles `evaluate`: prints the verdict and exits non-zero on failure
fn handle_evaluate(config: &Config, args: EvaluateArgs) -> Result<ExitCode> {
    let report = evaluate_run(&args.artifacts_dir, &config.evaluation).with_context(|| {
        format!(
            "Failed to evaluate artifacts in {}",
            args.artifacts_dir.display()
        )
    })?;

    println!("{}", report);

    let mut output = RunOutput::new(args.output_file.as_deref());
    report.write_to(&mut output);
    output.write();

    Ok(evaluation_exit_code(&report))
}

/// Exit status of an evaluation: 0 on success, 1 on failure
fn evaluation_exit_code(report: &EvaluationReport) -> ExitCode {
    if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
