//! Shared cancellation flag for one probe pool.
//!
//! Clones share the same cell. Stores use `Release` and loads use
//! `Acquire`, so a task that observes `cancelled` also observes every write
//! the canceller made before cancelling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Re-arm the token. Only valid once no task from the previous session
    /// can still observe it; `ProbePool::reset_for_new_session` waits for that.
    pub fn reset_for_new_session(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
