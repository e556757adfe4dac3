//! Per-session concurrency control.
//!
//! Ensures only one action runs per session at a time.  A second request
//! arriving while an action is in flight is rejected immediately rather
//! than queued, so the external action is never invoked twice
//! concurrently for the same session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Manages per-session action locks.
///
/// Each session ID maps to a `Semaphore(1)`.  Lookup and acquisition happen
/// under the map mutex, so pruning can never hand two callers different
/// semaphores for the same session.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Take the action lock for a session without waiting.
    ///
    /// The returned permit releases the lock on drop.
    pub fn try_acquire(&self, session_id: &str) -> Result<SessionPermit, SessionBusy> {
        let mut locks = self.locks.lock();
        let sem = locks
            .entry(session_id.to_owned())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone();
        sem.try_acquire_owned()
            .map(|permit| SessionPermit { _permit: permit })
            .map_err(|_| SessionBusy)
    }

    /// Number of tracked sessions (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop entries whose lock is not currently held.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

/// Proof that the holder owns a session's action lock.
pub struct SessionPermit {
    _permit: OwnedSemaphorePermit,
}

/// Returned when a session already has an action in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy: an action is already in progress")
    }
}

impl std::error::Error for SessionBusy {}
