//! Run progress tracking
//!
//! Owned solely by the coordinator; no other task reads or writes it.

use crate::space::SpaceCounts;
use std::time::{Duration, Instant};

/// Aggregate progress of the current run
#[derive(Debug)]
pub struct RunState {
    started: Instant,
    /// Attempts dispatched this run (retries counted separately)
    pub dispatched: u64,
    /// Outcomes that scheduled a retry
    pub retries_scheduled: u64,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            dispatched: 0,
            retries_scheduled: 0,
        }
    }

    pub fn record_dispatch(&mut self) {
        self.dispatched += 1;
    }

    pub fn record_retry(&mut self) {
        self.retries_scheduled += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Produces a point-in-time progress view from the space counts
    pub fn snapshot(&self, counts: SpaceCounts) -> ProgressSnapshot {
        let elapsed = self.elapsed();
        let settled = counts.done + counts.failed;
        let rate = if elapsed.as_secs_f64() > 0.0 {
            settled as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let eta = if rate > 0.0 && counts.remaining() > 0 {
            Some(Duration::from_secs_f64(counts.remaining() as f64 / rate))
        } else {
            None
        };

        ProgressSnapshot {
            counts,
            dispatched: self.dispatched,
            retries_scheduled: self.retries_scheduled,
            elapsed,
            units_per_second: rate,
            eta,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time view of run progress, suitable for logging
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub counts: SpaceCounts,
    pub dispatched: u64,
    pub retries_scheduled: u64,
    pub elapsed: Duration,
    pub units_per_second: f64,
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    /// One-line summary for periodic progress logs
    pub fn summary(&self) -> String {
        let eta = match self.eta {
            Some(d) => format!("{}s", d.as_secs()),
            None => "-".to_string(),
        };
        format!(
            "done {} / failed {} / remaining {} ({:.1} units/s, eta {})",
            self.counts.done,
            self.counts.failed,
            self.counts.remaining(),
            self.units_per_second,
            eta
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_pass_through() {
        let mut state = RunState::new();
        state.record_dispatch();
        state.record_dispatch();
        state.record_retry();

        let counts = SpaceCounts {
            total: 10,
            pending: 5,
            retrying: 1,
            in_flight: 2,
            done: 1,
            failed: 1,
        };
        let snap = state.snapshot(counts);

        assert_eq!(snap.dispatched, 2);
        assert_eq!(snap.retries_scheduled, 1);
        assert_eq!(snap.counts.remaining(), 8);
    }

    #[test]
    fn test_no_eta_when_nothing_settled() {
        let state = RunState::new();
        let snap = state.snapshot(SpaceCounts {
            total: 10,
            pending: 10,
            ..Default::default()
        });
        assert!(snap.eta.is_none());
        assert!(snap.summary().contains("eta -"));
    }
}
