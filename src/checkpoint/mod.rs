//! Durable checkpoint store
//!
//! The checkpoint records the latest delivery state of every work unit so
//! an interrupted or crashed run can resume without redoing finished work.
//! Writes are append-and-supersede: the newest entry per unit wins, ordered
//! by a logical sequence number rather than wall-clock time.

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteCheckpoint;
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};

use crate::space::{FailureKind, WorkStatus};
use std::fmt;

/// The durable state of one work unit
#[derive(Debug, Clone)]
pub struct CheckpointEntry {
    /// The IMO number this entry describes
    pub imo: u64,

    /// Latest recorded status
    pub status: WorkStatus,

    /// Delivery attempts so far
    pub attempts: u32,

    /// Classification of the last failure, if any
    pub failure_kind: Option<FailureKind>,

    /// Logical write sequence; higher supersedes lower
    pub seq: i64,

    /// RFC 3339 timestamp of the write (informational only)
    pub updated_at: String,

    /// Run that produced this entry
    pub run_id: i64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Run is in progress (or was, if the process died)
    Running,

    /// Run finished with every unit in a terminal status
    Completed,

    /// Run was stopped cleanly before finishing
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Metadata for one harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in [
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Interrupted,
        ] {
            assert_eq!(RunStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(RunStatus::from_db_string("bogus"), None);
    }
}
