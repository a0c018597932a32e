//! Concurrency gate shared by all fetch executors of one batch.
//!
//! At most `capacity` holders are admitted at once. Admission is scoped: the
//! returned [`GatePermit`] releases its slot when dropped, so release happens
//! on every exit path of the guarded work, including panics.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::GateError;

#[derive(Debug)]
struct GateInner {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    /// Holders currently admitted. Tracked separately from the semaphore so
    /// the capacity invariant can be checked.
    in_use: AtomicUsize,
    violation: Mutex<Option<GateError>>,
}

impl GateInner {
    /// Keeps the first violation seen.
    fn record_violation(&self, err: GateError) {
        let mut slot = self.violation.lock().unwrap_or_else(|e| e.into_inner());
        slot.get_or_insert(err);
    }
}

/// Counting admission gate with capacity K >= 1.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    inner: Arc<GateInner>,
}

impl ConcurrencyGate {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            inner: Arc::new(GateInner {
                capacity,
                semaphore: Arc::new(Semaphore::new(capacity)),
                in_use: AtomicUsize::new(0),
                violation: Mutex::new(None),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of holders currently admitted.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Waits until fewer than `capacity` holders are admitted, then admits the caller.
    /// Errors only when the gate protocol is broken or the gate was closed.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;

        let in_use = self.inner.in_use.fetch_add(1, Ordering::AcqRel) + 1;
        let permit = GatePermit {
            inner: Arc::clone(&self.inner),
            _permit: permit,
        };
        if in_use > self.inner.capacity {
            let err = GateError::ProtocolViolation {
                in_use,
                capacity: self.inner.capacity,
            };
            tracing::error!(in_use, capacity = self.inner.capacity, "gate capacity exceeded");
            self.inner.record_violation(err.clone());
            return Err(err);
        }
        Ok(permit)
    }

    /// Closes the gate; pending and future `acquire` calls fail with [`GateError::Closed`].
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    /// Reports a protocol violation observed at any point of the gate's lifetime.
    pub fn check(&self) -> Result<(), GateError> {
        let slot = self.inner.violation.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// One admission slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    inner: Arc<GateInner>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let released = self
            .inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if released.is_err() {
            tracing::error!("gate release without matching acquire");
            self.inner.record_violation(GateError::ReleaseWithoutAcquire);
        }
    }
}
