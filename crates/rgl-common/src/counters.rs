//! Process-wide activity counters with an explicit ownership contract.
//!
//! A counter is active while its count is nonzero. Components that change
//! behavior when, say, a debugger front-end is attached take an
//! `Arc<AttachCounter>` at construction instead of reading ambient global
//! state, so tests can instantiate independent counters. The process-wide
//! default exists for embedders that have exactly one attach domain.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::debug;

#[derive(Debug, Default)]
pub struct AttachCounter(AtomicU32);

impl AttachCounter {
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Register one attached client. Pairs with `decrement`.
    pub fn increment(&self) {
        let n = self.0.fetch_add(1, Ordering::Relaxed);
        debug!(count = n + 1, "attach counter incremented");
    }

    /// Unregister one attached client. Saturates at zero; a decrement
    /// without a matching increment is a caller bug but not UB.
    pub fn decrement(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        debug!(count = self.count(), "attach counter decremented");
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.count() > 0
    }
}

/// The process-wide default counter for attached debugger front-ends.
pub fn process_attach_counter() -> Arc<AttachCounter> {
    static DEFAULT: OnceLock<Arc<AttachCounter>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(AttachCounter::new())).clone()
}
