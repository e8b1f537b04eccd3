//! Run coordinator
//!
//! Single control loop that drives a harvest: draw dispatchable keys from
//! the identifier space, acquire a governor slot for each, spawn the
//! extraction as an independent task, and take results back through one
//! channel. Worker tasks never touch shared state; every state change,
//! checkpoint write, and permit release happens here.
//!
//! Ordering invariant: a unit's outcome is written to the checkpoint store
//! before its permit is dropped. A crash between dispatch and the outcome
//! write leaves the stored entry `in_flight`, which the next run re-queues
//! (at-least-once delivery).

use crate::checkpoint::CheckpointStore;
use crate::config::RunConfig;
use crate::engine::governor::{Governor, Permit};
use crate::engine::progress::RunState;
use crate::engine::shutdown::ShutdownFlag;
use crate::sink::RecordSink;
use crate::space::{
    Disposition, FailureKind, IdentifierSpace, Outcome, SpaceCounts, WorkStatus,
};
use crate::strategy::{ExtractError, ExtractionStrategy, Record};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How often the control loop wakes to re-check retries and shutdown while
/// waiting on results
const INTAKE_TICK: Duration = Duration::from_millis(100);

/// Bounded retries for an outcome checkpoint write
const CHECKPOINT_WRITE_RETRIES: u32 = 3;

/// Interval between progress log lines
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No dispatchable work remains; units whose in-flight entry could not
    /// be checkpointed stay pending for a later run
    Completed,

    /// The run was cancelled and stopped cleanly; remaining units are
    /// untouched and a later run resumes them
    Stopped,
}

/// Final report of a run
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub counts: SpaceCounts,
    pub dispatched: u64,
    pub elapsed: Duration,
}

/// A finished extraction, sent from a worker task to the control loop
///
/// The governor permit rides along so the slot is freed only after the
/// coordinator has checkpointed the outcome.
struct TaskDone {
    imo: u64,
    result: std::result::Result<Record, ExtractError>,
    permit: Permit,
}

/// Drives one harvest run to completion or clean stop
pub struct Coordinator<S, C, K>
where
    S: ExtractionStrategy,
    C: CheckpointStore,
    K: RecordSink,
{
    space: IdentifierSpace,
    strategy: Arc<S>,
    governor: Governor,
    store: C,
    sink: K,
    shutdown: ShutdownFlag,
    run_id: i64,
    concurrency_limit: usize,
    request_timeout: Duration,
    state: RunState,
    last_progress_log: Instant,
}

impl<S, C, K> Coordinator<S, C, K>
where
    S: ExtractionStrategy,
    C: CheckpointStore,
    K: RecordSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run: &RunConfig,
        space: IdentifierSpace,
        strategy: S,
        governor: Governor,
        store: C,
        sink: K,
        shutdown: ShutdownFlag,
        run_id: i64,
    ) -> Self {
        Self {
            space,
            strategy: Arc::new(strategy),
            governor,
            store,
            sink,
            shutdown,
            run_id,
            concurrency_limit: run.concurrency_limit as usize,
            request_timeout: Duration::from_secs(run.request_timeout_secs),
            state: RunState::new(),
            last_progress_log: Instant::now(),
        }
    }

    /// Runs the harvest to completion or clean stop
    pub async fn run(mut self) -> Result<RunReport> {
        // Capacity covers every task that could hold a permit, so sends
        // from workers can never block against a full channel
        let (tx, mut rx) = mpsc::channel::<TaskDone>(self.concurrency_limit.max(1));
        let mut stopped = false;

        tracing::info!(
            "Run {} starting: {} candidate units, concurrency {}",
            self.run_id,
            self.space.counts().remaining(),
            self.concurrency_limit
        );

        loop {
            if self.shutdown.is_triggered() {
                stopped = true;
                break;
            }
            if self.space.is_complete() {
                break;
            }

            let room = self.concurrency_limit.saturating_sub(self.space.in_flight());
            if room > 0 {
                let batch = self.space.next_batch(room, Instant::now());
                for imo in batch {
                    self.dispatch(imo, &tx).await?;
                }
            }

            if self.space.in_flight() > 0 {
                match tokio::time::timeout(INTAKE_TICK, rx.recv()).await {
                    Ok(Some(done)) => self.settle(done)?,
                    // We hold a sender, so the channel cannot close
                    Ok(None) => break,
                    Err(_) => {}
                }
            } else if let Some(delay) = self.space.time_until_next_retry(Instant::now()) {
                // Nothing in flight; wait for the soonest backoff to elapse
                tokio::time::sleep(delay.min(INTAKE_TICK)).await;
            }

            self.maybe_log_progress();
        }

        if stopped {
            tracing::info!(
                "Stop requested; draining {} in-flight extraction(s)",
                self.space.in_flight()
            );
        }

        // Drain whatever is still in flight so every dispatched attempt
        // gets its outcome checkpointed
        while self.space.in_flight() > 0 {
            match rx.recv().await {
                Some(done) => self.settle(done)?,
                None => break,
            }
        }

        if stopped {
            self.store.interrupt_run(self.run_id)?;
        } else {
            self.store.complete_run(self.run_id)?;
        }
        self.store.flush()?;

        let counts = self.space.counts();
        let outcome = if stopped {
            RunOutcome::Stopped
        } else {
            RunOutcome::Completed
        };

        tracing::info!(
            "Run {} {}: {} done, {} failed, {} remaining ({} dispatched in {:?})",
            self.run_id,
            if stopped { "stopped" } else { "completed" },
            counts.done,
            counts.failed,
            counts.remaining(),
            self.state.dispatched,
            self.state.elapsed()
        );

        Ok(RunReport {
            outcome,
            counts,
            dispatched: self.state.dispatched,
            elapsed: self.state.elapsed(),
        })
    }

    /// Acquires a slot, checkpoints the unit as in-flight, and spawns its
    /// extraction
    ///
    /// If the store refuses the in-flight entry after bounded retries, the
    /// unit is set aside still pending and nothing is spawned; a later run
    /// picks it up. Only governor failure aborts the run here.
    async fn dispatch(&mut self, imo: u64, tx: &mpsc::Sender<TaskDone>) -> Result<()> {
        let permit = self.governor.acquire().await?;

        // The in-flight entry lands before the task starts; a crash from
        // here until the outcome write re-delivers this unit next run
        let attempts = self.space.attempts(imo);
        if !self.append_with_retries(imo, WorkStatus::InFlight, attempts) {
            tracing::error!(
                "Could not checkpoint dispatch of imo {}; leaving it pending",
                imo
            );
            self.space.defer(imo);
            drop(permit);
            return Ok(());
        }

        self.state.record_dispatch();
        tracing::debug!("Dispatching imo {} (attempt {})", imo, attempts + 1);

        let strategy = Arc::clone(&self.strategy);
        let tx = tx.clone();
        let deadline = self.request_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(deadline, strategy.extract(imo)).await {
                Ok(result) => result,
                Err(_) => Err(ExtractError::Timeout),
            };
            // If the coordinator is gone the permit is released on drop
            let _ = tx.send(TaskDone { imo, result, permit }).await;
        });

        Ok(())
    }

    /// Maps a finished extraction to an outcome, stores the record,
    /// checkpoints the result, and frees the slot
    fn settle(&mut self, done: TaskDone) -> Result<()> {
        let TaskDone {
            imo,
            result,
            permit,
        } = done;

        let outcome = match result {
            Ok(record) => match self.sink.store(imo, &record) {
                Ok(()) => Outcome::Success,
                Err(e) => {
                    // Fetched but not durably stored; treat as a transient
                    // failure so the unit is retried rather than lost
                    tracing::warn!("Failed to store record for imo {}: {}", imo, e);
                    Outcome::Failure(FailureKind::Transient)
                }
            },
            Err(e) => {
                tracing::debug!("Extraction failed for imo {}: {}", imo, e);
                Outcome::Failure(e.failure_kind())
            }
        };

        let disposition = self.space.mark_outcome(imo, outcome, Instant::now());
        let attempts = self.space.attempts(imo);

        let status = match disposition {
            Disposition::Done => WorkStatus::Done,
            Disposition::Retry { delay } => {
                self.state.record_retry();
                tracing::info!(
                    "Retrying imo {} in {:?} (attempt {} of max)",
                    imo,
                    delay,
                    attempts
                );
                WorkStatus::Retrying
            }
            Disposition::FailedTerminal(kind) => {
                tracing::warn!(
                    "imo {} failed terminally after {} attempt(s): {}",
                    imo,
                    attempts,
                    kind
                );
                WorkStatus::Failed
            }
        };

        if !self.append_with_retries(imo, status, attempts) {
            // The entry written at dispatch stays in_flight, so the next
            // run re-delivers this unit; the in-memory space has already
            // advanced and the current run can terminate
            tracing::error!(
                "Giving up on checkpoint writes for imo {}; it will be re-delivered",
                imo
            );
        }

        // Checkpoint first, then free the slot
        drop(permit);
        Ok(())
    }

    /// Writes a checkpoint entry with bounded retries
    ///
    /// Returns false once every try has failed; callers decide what that
    /// means for the unit.
    fn append_with_retries(&mut self, imo: u64, status: WorkStatus, attempts: u32) -> bool {
        let failure = self.space.failure(imo);
        for write_attempt in 1..=CHECKPOINT_WRITE_RETRIES {
            match self
                .store
                .append(imo, status, attempts, failure, self.run_id)
            {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        "Checkpoint write for imo {} failed (try {}): {}",
                        imo,
                        write_attempt,
                        e
                    );
                }
            }
        }
        false
    }

    fn maybe_log_progress(&mut self) {
        if self.last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL {
            let snapshot = self.state.snapshot(self.space.counts());
            tracing::info!("Progress: {}", snapshot.summary());
            self.last_progress_log = Instant::now();
        }
    }
}
