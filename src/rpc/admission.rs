//! Counting pool that caps the number of live sessions.
//!
//! The listener acquires a slot before spawning a session and hands it over;
//! the session releases it by dropping it, whichever way the session ends.

use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::trace;

#[derive(Clone)]
pub struct AdmissionPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// One unit of the pool. Released exactly once, on drop.
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        trace!("admission slot released");
    }
}

impl AdmissionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait, without a deadline, until a slot is free.
    pub async fn acquire(&self) -> Result<AdmissionSlot, AcquireError> {
        let permit = self.permits.clone().acquire_owned().await?;
        Ok(AdmissionSlot { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }
}
