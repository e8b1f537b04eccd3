//! The harvest engine
//!
//! Wires the identifier space, governor, checkpoint store, extraction
//! strategy, and record sink together and runs the coordinator loop.

mod coordinator;
mod governor;
mod progress;
mod retry;
mod shutdown;

pub use coordinator::{Coordinator, RunOutcome, RunReport};
pub use governor::{Governor, Permit};
pub use progress::{ProgressSnapshot, RunState};
pub use retry::RetryPolicy;
pub use shutdown::ShutdownFlag;

use crate::checkpoint::{CheckpointStore, RunStatus, SqliteCheckpoint};
use crate::config::Config;
use crate::sink::JsonDirSink;
use crate::space::{IdentifierSpace, KeySpec};
use crate::strategy::VesselPageStrategy;
use crate::Result;
use std::path::Path;
use std::time::Duration;

/// Backoff after the first failed attempt
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any single backoff delay
const RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

/// Runs a harvest with the production collaborators
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `config_hash` - Hash of the configuration file, recorded on the run
/// * `fresh` - Discard previous work unit state instead of resuming
/// * `shutdown` - Flag checked between dispatches for clean cancellation
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    fresh: bool,
    shutdown: ShutdownFlag,
) -> Result<RunReport> {
    let mut store = SqliteCheckpoint::new(Path::new(&config.output.checkpoint_path))?;

    if fresh {
        tracing::info!("Starting fresh: discarding previous work unit state");
        store.clear_work_units()?;
    }

    // A run still marked running belongs to a process that died
    if let Some(prev) = store.latest_run()? {
        if prev.status == RunStatus::Running {
            tracing::warn!("Previous run {} never finished; marking it interrupted", prev.id);
            store.interrupt_run(prev.id)?;
        }
        if prev.config_hash != config_hash {
            tracing::warn!(
                "Configuration changed since run {} (hash {} -> {})",
                prev.id,
                prev.config_hash,
                config_hash
            );
        }
    }

    let run_id = store.create_run(config_hash)?;

    let policy = RetryPolicy::new(config.run.max_attempts, RETRY_BASE_DELAY, RETRY_MAX_DELAY);
    let spec = KeySpec::from_config(&config.identifiers)?;
    let mut space = IdentifierSpace::new(&spec, policy, config.identifiers.validate_checksum)?;

    if !fresh {
        let entries = store.load_all()?;
        if !entries.is_empty() {
            tracing::info!("Resuming: {} unit(s) have checkpoint state", entries.len());
        }
        space.load_checkpoint(&entries);
    }

    let strategy = VesselPageStrategy::new(
        &config.source.base_url,
        Duration::from_secs(config.run.request_timeout_secs),
    )?;
    let sink = JsonDirSink::new(Path::new(&config.output.records_dir))?;
    let governor = Governor::new(
        config.run.concurrency_limit as usize,
        Duration::from_millis(config.run.min_interval_ms),
    )?;

    let coordinator = Coordinator::new(
        &config.run,
        space,
        strategy,
        governor,
        store,
        sink,
        shutdown,
        run_id,
    );
    coordinator.run().await
}
