//! Rate and concurrency governor
//!
//! The governor owns two limits: how many extractions may be in flight at
//! once (a semaphore) and how closely together dispatches may be granted
//! (a minimum interval between grant times). Both are enforced at the
//! single point where the coordinator asks for a dispatch slot.

use crate::{HarvestError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// A held dispatch slot; dropping it frees the slot
///
/// Releasing a permit has no effect on pacing: the minimum interval is
/// measured between grant times, not completions.
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

/// Enforces the concurrency limit and minimum dispatch interval
pub struct Governor {
    semaphore: Arc<Semaphore>,
    /// Grant time of the most recent permit; the lock is held across the
    /// pacing sleep so grants are serialized and evenly spaced
    last_grant: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl Governor {
    /// Creates a governor
    ///
    /// # Arguments
    ///
    /// * `concurrency_limit` - Maximum permits outstanding at once (must be >= 1)
    /// * `min_interval` - Minimum time between consecutive grants
    pub fn new(concurrency_limit: usize, min_interval: Duration) -> Result<Self> {
        if concurrency_limit == 0 {
            return Err(HarvestError::InvalidSpec(
                "concurrency limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            last_grant: Mutex::new(None),
            min_interval,
        })
    }

    /// Acquires a dispatch slot, suspending until one is free and the
    /// minimum interval since the previous grant has elapsed
    pub async fn acquire(&self) -> Result<Permit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| HarvestError::GovernorClosed)?;

        let mut last = self.last_grant.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());

        Ok(Permit { _permit: permit })
    }

    /// Number of slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
