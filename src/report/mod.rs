//! Statistics generation from the checkpoint database
//!
//! This module extracts and displays harvest statistics from the
//! checkpoint store for the `--stats` CLI mode.

use crate::checkpoint::{CheckpointStore, RunRecord};
use crate::space::{FailureKind, WorkStatus};
use crate::Result;
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of recorded work units
    pub total_units: u64,

    /// Count of units by status
    pub units_by_status: HashMap<WorkStatus, u64>,

    /// Count of recorded failures by kind
    pub failure_summary: HashMap<FailureKind, u64>,

    /// Highest attempt count recorded for any unit
    pub max_attempts: u32,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from the checkpoint store
pub fn load_statistics<C: CheckpointStore>(store: &C) -> Result<HarvestStatistics> {
    let total_units = store.count_total_units()?;

    let mut units_by_status = HashMap::new();
    for status in WorkStatus::all_statuses() {
        let count = store.count_units_by_status(status)?;
        if count > 0 {
            units_by_status.insert(status, count);
        }
    }

    let failure_summary = store.failure_summary()?;
    let max_attempts = store.max_attempts_seen()?;
    let latest_run = store.latest_run()?;

    Ok(HarvestStatistics {
        total_units,
        units_by_status,
        failure_summary,
        max_attempts,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        println!("Latest run: #{} ({})", run.id, run.status);
        println!("  Started:  {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!();
    }

    println!("Overview:");
    println!("  Recorded units: {}", stats.total_units);
    println!("  Max attempts on a single unit: {}", stats.max_attempts);
    println!();

    println!("Units by Status:");
    let mut status_counts: Vec<_> = stats.units_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in status_counts {
        let percentage = if stats.total_units > 0 {
            (*count as f64 / stats.total_units as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.failure_summary.is_empty() {
        println!("Failure Summary:");
        let mut failure_counts: Vec<_> = stats.failure_summary.iter().collect();
        failure_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in failure_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    let done = stats
        .units_by_status
        .get(&WorkStatus::Done)
        .copied()
        .unwrap_or(0);
    let success_rate = if stats.total_units > 0 {
        (done as f64 / stats.total_units as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} units done)",
        success_rate, done, stats.total_units
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::SqliteCheckpoint;

    #[test]
    fn test_load_statistics() {
        let mut store = SqliteCheckpoint::open_in_memory().unwrap();
        let run_id = store.create_run("abc").unwrap();

        store
            .append(1_000_001, WorkStatus::Done, 1, None, run_id)
            .unwrap();
        store
            .append(1_000_002, WorkStatus::Done, 2, None, run_id)
            .unwrap();
        store
            .append(
                1_000_003,
                WorkStatus::Failed,
                3,
                Some(FailureKind::Timeout),
                run_id,
            )
            .unwrap();

        let stats = load_statistics(&store).unwrap();

        assert_eq!(stats.total_units, 3);
        assert_eq!(stats.units_by_status[&WorkStatus::Done], 2);
        assert_eq!(stats.units_by_status[&WorkStatus::Failed], 1);
        assert_eq!(stats.failure_summary[&FailureKind::Timeout], 1);
        assert_eq!(stats.max_attempts, 3);
        assert_eq!(stats.latest_run.unwrap().id, run_id);
    }

    #[test]
    fn test_statistics_on_empty_store() {
        let store = SqliteCheckpoint::open_in_memory().unwrap();
        let stats = load_statistics(&store).unwrap();

        assert_eq!(stats.total_units, 0);
        assert!(stats.units_by_status.is_empty());
        assert!(stats.latest_run.is_none());
    }
}
