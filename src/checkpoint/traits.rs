//! Checkpoint store trait and error types

use crate::checkpoint::{CheckpointEntry, RunRecord};
use crate::space::{FailureKind, WorkStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt checkpoint entry for imo {imo}: {message}")]
    Corrupt { imo: u64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Trait for checkpoint store backends
///
/// The store keeps the latest durable state of every work unit plus
/// per-run metadata. A write never reports success before the entry is
/// durable enough to survive the process dying.
pub trait CheckpointStore {
    // ===== Run Management =====

    /// Creates a new run in `running` status
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> CheckpointResult<i64>;

    /// Gets the most recent run
    fn latest_run(&self) -> CheckpointResult<Option<RunRecord>>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> CheckpointResult<()>;

    /// Marks a run as interrupted with a finish timestamp
    fn interrupt_run(&mut self, run_id: i64) -> CheckpointResult<()>;

    // ===== Work Units =====

    /// Records the latest state of a work unit
    ///
    /// Assigns the next logical sequence number; an entry never overwrites
    /// one with a higher sequence (last write wins).
    fn append(
        &mut self,
        imo: u64,
        status: WorkStatus,
        attempts: u32,
        failure_kind: Option<FailureKind>,
        run_id: i64,
    ) -> CheckpointResult<()>;

    /// Loads the up-to-date state of every recorded unit in one pass
    fn load_all(&self) -> CheckpointResult<HashMap<u64, CheckpointEntry>>;

    /// Durability barrier: all prior appends are on disk when this returns
    fn flush(&mut self) -> CheckpointResult<()>;

    /// Discards all work unit state (for fresh runs)
    fn clear_work_units(&mut self) -> CheckpointResult<()>;

    // ===== Statistics =====

    /// Total number of recorded units
    fn count_total_units(&self) -> CheckpointResult<u64>;

    /// Number of units currently in the given status
    fn count_units_by_status(&self, status: WorkStatus) -> CheckpointResult<u64>;

    /// Counts of recorded failure kinds across all units
    fn failure_summary(&self) -> CheckpointResult<HashMap<FailureKind, u64>>;

    /// Highest attempt count recorded for any unit
    fn max_attempts_seen(&self) -> CheckpointResult<u32>;
}
