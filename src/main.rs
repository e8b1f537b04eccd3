//! Baltic-Harvest main entry point
//!
//! This is the command-line interface for the Baltic-Harvest vessel record
//! harvester.

use baltic_harvest::config::load_config_with_hash;
use baltic_harvest::engine::{run_harvest, RunOutcome, ShutdownFlag};
use baltic_harvest::space::KeySpec;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Baltic-Harvest: a resumable vessel record harvester
///
/// Baltic-Harvest fetches vessel records by IMO number, checkpointing every
/// outcome so an interrupted run can be resumed exactly where it left off.
#[derive(Parser, Debug)]
#[command(name = "baltic-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable vessel record harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted harvest (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh harvest, ignoring previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the checkpoint database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("baltic_harvest=info,warn"),
            1 => EnvFilter::new("baltic_harvest=debug,info"),
            2 => EnvFilter::new("baltic_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the plan
fn handle_dry_run(config: &baltic_harvest::Config) -> anyhow::Result<()> {
    println!("=== Baltic-Harvest Dry Run ===\n");

    println!("Run Configuration:");
    println!("  Concurrency limit: {}", config.run.concurrency_limit);
    println!("  Min dispatch interval: {}ms", config.run.min_interval_ms);
    println!("  Max attempts: {}", config.run.max_attempts);
    println!("  Request timeout: {}s", config.run.request_timeout_secs);

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Records dir: {}", config.output.records_dir);

    let spec = KeySpec::from_config(&config.identifiers)?;
    let candidates = spec.candidates()?;
    let valid = if config.identifiers.validate_checksum {
        candidates
            .iter()
            .filter(|&&imo| baltic_harvest::space::imo_checksum_ok(imo))
            .count()
    } else {
        candidates.len()
    };

    println!("\nIdentifiers:");
    println!("  Candidates: {}", candidates.len());
    if config.identifiers.validate_checksum {
        println!("  Passing IMO checksum: {}", valid);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would dispatch up to {} unit(s)", valid);

    Ok(())
}

/// Handles the --stats mode: shows statistics from the checkpoint database
fn handle_stats(config: &baltic_harvest::Config) -> anyhow::Result<()> {
    use baltic_harvest::checkpoint::SqliteCheckpoint;
    use baltic_harvest::report::{load_statistics, print_statistics};
    use std::path::Path;

    println!("Checkpoint: {}\n", config.output.checkpoint_path);

    let store = SqliteCheckpoint::new(Path::new(&config.output.checkpoint_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &baltic_harvest::Config,
    config_hash: &str,
    fresh: bool,
) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring previous state)");
    } else {
        tracing::info!("Starting harvest (will resume if checkpoint state exists)");
    }

    // Wire Ctrl-C to a clean stop: no new dispatches, in-flight work drained
    let shutdown = ShutdownFlag::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received; finishing in-flight work");
                shutdown.trigger();
            }
        });
    }

    let report = run_harvest(config, config_hash, fresh, shutdown).await?;

    match report.outcome {
        RunOutcome::Completed => {
            tracing::info!(
                "Harvest completed: {} done, {} failed",
                report.counts.done,
                report.counts.failed
            );
            if report.counts.failed > 0 {
                tracing::warn!(
                    "{} unit(s) failed terminally; see --stats for a breakdown",
                    report.counts.failed
                );
            }
        }
        RunOutcome::Stopped => {
            tracing::info!(
                "Harvest stopped early: {} done so far, {} remaining; rerun to resume",
                report.counts.done,
                report.counts.remaining()
            );
        }
    }

    Ok(())
}
