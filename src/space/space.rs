//! The identifier space: candidate set and per-unit delivery state
//!
//! All scheduling state lives here, owned by the run coordinator. The space
//! is purely in-memory; durable state is merged in once at startup via
//! [`IdentifierSpace::load_checkpoint`] and written back by the coordinator
//! as outcomes arrive.

use crate::checkpoint::CheckpointEntry;
use crate::config::{IdentifierConfig, IdentifierMode};
use crate::engine::RetryPolicy;
use crate::space::imo::{imo_checksum_ok, imo_from_vessel_url};
use crate::space::status::{FailureKind, WorkStatus};
use crate::HarvestError;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How the candidate identifier set is produced
#[derive(Debug, Clone)]
pub enum KeySpec {
    /// A contiguous inclusive range of IMO numbers
    Range { start: u64, end: u64 },

    /// An explicit list of IMO numbers
    List(Vec<u64>),

    /// A file of vessel URLs, one per line
    UrlFile(PathBuf),
}

impl KeySpec {
    /// Builds a key spec from the identifiers section of the config
    pub fn from_config(ids: &IdentifierConfig) -> Result<Self, HarvestError> {
        match ids.mode {
            IdentifierMode::Range => {
                let start = ids.start_imo.ok_or_else(|| {
                    HarvestError::InvalidSpec("range mode requires start-imo".to_string())
                })?;
                let end = ids.end_imo.ok_or_else(|| {
                    HarvestError::InvalidSpec("range mode requires end-imo".to_string())
                })?;
                Ok(Self::Range { start, end })
            }
            IdentifierMode::List => {
                let list = ids.list.clone().ok_or_else(|| {
                    HarvestError::InvalidSpec("list mode requires a list".to_string())
                })?;
                Ok(Self::List(list))
            }
            IdentifierMode::UrlFile => {
                let path = ids.url_file.clone().ok_or_else(|| {
                    HarvestError::InvalidSpec("url-file mode requires a path".to_string())
                })?;
                Ok(Self::UrlFile(PathBuf::from(path)))
            }
        }
    }

    /// Materializes the candidate identifiers in dispatch order
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpec` for an inverted range or an empty list, and an
    /// IO error if a URL file cannot be read.
    pub fn candidates(&self) -> Result<Vec<u64>, HarvestError> {
        match self {
            Self::Range { start, end } => {
                if start > end {
                    return Err(HarvestError::InvalidSpec(format!(
                        "inverted range: start-imo {} > end-imo {}",
                        start, end
                    )));
                }
                Ok((*start..=*end).collect())
            }
            Self::List(list) => {
                if list.is_empty() {
                    return Err(HarvestError::InvalidSpec(
                        "identifier list is empty".to_string(),
                    ));
                }
                Ok(list.clone())
            }
            Self::UrlFile(path) => {
                let content = std::fs::read_to_string(path)?;
                Ok(content.lines().filter_map(imo_from_vessel_url).collect())
            }
        }
    }
}

/// The result of one delivery attempt, as seen by the space
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    /// The record was extracted and stored
    Success,

    /// The attempt failed with the given classification
    Failure(FailureKind),
}

/// What the space decided to do with a unit after an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Unit is complete
    Done,

    /// Unit will be re-dispatched after the given backoff delay
    Retry { delay: Duration },

    /// Unit failed terminally
    FailedTerminal(FailureKind),
}

/// Counts of units by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceCounts {
    pub total: u64,
    pub pending: u64,
    pub retrying: u64,
    pub in_flight: u64,
    pub done: u64,
    pub failed: u64,
}

impl SpaceCounts {
    /// Units that still need an outcome
    pub fn remaining(&self) -> u64 {
        self.pending + self.retrying + self.in_flight
    }
}

/// Per-unit delivery state
#[derive(Debug, Clone, Copy)]
struct UnitState {
    status: WorkStatus,
    attempts: u32,
    failure: Option<FailureKind>,
}

impl UnitState {
    fn pending() -> Self {
        Self {
            status: WorkStatus::Pending,
            attempts: 0,
            failure: None,
        }
    }
}

/// The set of identifiers a run is responsible for, with scheduling state
///
/// Only the coordinator touches the space, so it needs no interior
/// mutability. Keys move `Pending -> InFlight -> {Done, Retrying, Failed}`;
/// `Retrying` keys return to `Pending` once their backoff elapses.
pub struct IdentifierSpace {
    units: HashMap<u64, UnitState>,

    /// Keys ready for dispatch, in order
    queue: VecDeque<u64>,

    /// Keys waiting out a backoff delay, soonest first
    retry_wait: BinaryHeap<Reverse<(Instant, u64)>>,

    /// Keys currently reserved by in-flight tasks
    reserved: HashSet<u64>,

    /// Keys set aside for the rest of the run, still pending
    deferred: Vec<u64>,

    policy: RetryPolicy,
    done: u64,
    failed: u64,
}

impl IdentifierSpace {
    /// Creates a space from a key spec
    ///
    /// Duplicates are dropped (first occurrence wins). When
    /// `validate_checksum` is set, candidates failing the IMO check digit
    /// are filtered out up front; an empty result is not an error, the run
    /// simply completes with zero dispatches.
    pub fn new(
        spec: &KeySpec,
        policy: RetryPolicy,
        validate_checksum: bool,
    ) -> Result<Self, HarvestError> {
        let candidates = spec.candidates()?;

        let mut seen = HashSet::new();
        let mut units = HashMap::new();
        let mut queue = VecDeque::new();

        for imo in candidates {
            if validate_checksum && !imo_checksum_ok(imo) {
                continue;
            }
            if seen.insert(imo) {
                units.insert(imo, UnitState::pending());
                queue.push_back(imo);
            }
        }

        Ok(Self {
            units,
            queue,
            retry_wait: BinaryHeap::new(),
            reserved: HashSet::new(),
            deferred: Vec::new(),
            policy,
            done: 0,
            failed: 0,
        })
    }

    /// Merges checkpoint entries from previous runs
    ///
    /// Terminal units leave the dispatch queue for good. Non-terminal
    /// entries keep their attempt counts: `retrying` units are re-queued
    /// without waiting out their old backoff, and `in_flight` units from a
    /// crashed run are re-queued as pending (at-least-once delivery).
    ///
    /// Must be called before the first `next_batch`.
    pub fn load_checkpoint(&mut self, entries: &HashMap<u64, CheckpointEntry>) {
        for (imo, entry) in entries {
            let Some(unit) = self.units.get_mut(imo) else {
                // Entry for a key outside the configured set; ignore it
                continue;
            };

            unit.attempts = entry.attempts;
            unit.failure = entry.failure_kind;

            match entry.status {
                WorkStatus::Done => {
                    unit.status = WorkStatus::Done;
                    self.done += 1;
                }
                WorkStatus::Failed => {
                    unit.status = WorkStatus::Failed;
                    self.failed += 1;
                }
                WorkStatus::Pending | WorkStatus::Retrying | WorkStatus::InFlight => {
                    unit.status = WorkStatus::Pending;
                }
            }
        }

        let units = &self.units;
        self.queue.retain(|imo| !units[imo].status.is_terminal());
    }

    /// Draws up to `n` keys for dispatch
    ///
    /// Promotes any retry whose backoff has elapsed, then hands out keys in
    /// queue order, marking each in-flight so it cannot be drawn again.
    /// Never blocks; returns an empty vec when nothing is ready.
    pub fn next_batch(&mut self, n: usize, now: Instant) -> Vec<u64> {
        self.promote_ready(now);

        let mut batch = Vec::new();
        while batch.len() < n {
            let Some(imo) = self.queue.pop_front() else {
                break;
            };
            if let Some(unit) = self.units.get_mut(&imo) {
                unit.status = WorkStatus::InFlight;
                self.reserved.insert(imo);
                batch.push(imo);
            }
        }
        batch
    }

    /// Records the outcome of a delivery attempt and decides what happens next
    pub fn mark_outcome(&mut self, imo: u64, outcome: Outcome, now: Instant) -> Disposition {
        self.reserved.remove(&imo);

        let unit = self.units.entry(imo).or_insert_with(UnitState::pending);
        unit.attempts += 1;

        match outcome {
            Outcome::Success => {
                unit.status = WorkStatus::Done;
                unit.failure = None;
                self.done += 1;
                Disposition::Done
            }
            Outcome::Failure(kind) => {
                unit.failure = Some(kind);
                if kind.is_retryable() && unit.attempts < self.policy.max_attempts {
                    unit.status = WorkStatus::Retrying;
                    let delay = self.policy.delay_for(unit.attempts);
                    self.retry_wait.push(Reverse((now + delay, imo)));
                    Disposition::Retry { delay }
                } else {
                    unit.status = WorkStatus::Failed;
                    self.failed += 1;
                    Disposition::FailedTerminal(kind)
                }
            }
        }
    }

    /// Sets a reserved key aside for the rest of the run
    ///
    /// Used when a drawn key could not actually be dispatched (the
    /// checkpoint refused its in-flight entry). The key stays pending for
    /// a later run but is never drawn again in this one; its attempt count
    /// is untouched.
    pub fn defer(&mut self, imo: u64) {
        if self.reserved.remove(&imo) {
            if let Some(unit) = self.units.get_mut(&imo) {
                unit.status = WorkStatus::Pending;
            }
            self.deferred.push(imo);
        }
    }

    /// Time until the soonest waiting retry becomes dispatchable
    ///
    /// Returns `Some(Duration::ZERO)` if one is already ready.
    pub fn time_until_next_retry(&self, now: Instant) -> Option<Duration> {
        self.retry_wait
            .peek()
            .map(|Reverse((ready, _))| ready.saturating_duration_since(now))
    }

    /// Number of attempts recorded for a key
    pub fn attempts(&self, imo: u64) -> u32 {
        self.units.get(&imo).map(|u| u.attempts).unwrap_or(0)
    }

    /// Current status of a key, if it belongs to the space
    pub fn status(&self, imo: u64) -> Option<WorkStatus> {
        self.units.get(&imo).map(|u| u.status)
    }

    /// Last recorded failure classification for a key
    pub fn failure(&self, imo: u64) -> Option<FailureKind> {
        self.units.get(&imo).and_then(|u| u.failure)
    }

    /// Number of keys reserved by in-flight tasks
    pub fn in_flight(&self) -> usize {
        self.reserved.len()
    }

    /// True once nothing can still be dispatched in this run
    ///
    /// Deferred keys do not block completion; they belong to a later run.
    pub fn is_complete(&self) -> bool {
        self.queue.is_empty() && self.retry_wait.is_empty() && self.reserved.is_empty()
    }

    /// Counts of units by status
    pub fn counts(&self) -> SpaceCounts {
        SpaceCounts {
            total: self.units.len() as u64,
            pending: (self.queue.len() + self.deferred.len()) as u64,
            retrying: self.retry_wait.len() as u64,
            in_flight: self.reserved.len() as u64,
            done: self.done,
            failed: self.failed,
        }
    }

    fn promote_ready(&mut self, now: Instant) {
        while let Some(Reverse((ready, imo))) = self.retry_wait.peek().copied() {
            if ready > now {
                break;
            }
            self.retry_wait.pop();
            if let Some(unit) = self.units.get_mut(&imo) {
                unit.status = WorkStatus::Pending;
            }
            self.queue.push_back(imo);
        }
    }
}
