//! Fixed-interval schedule, equivalent to a periodic tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::civil::Instant;
use crate::schedule::Schedule;

/// Fires every `interval`, optionally once immediately on the first call.
pub struct Ticker {
    interval: Duration,
    /// Cleared the first time `next` is called, regardless of the result —
    /// mirrors the one-shot "fire immediately" flag of the original.
    immediate: AtomicBool,
}

impl Ticker {
    /// Builds a new ticker. Panics if `interval` is shorter than one
    /// second: the crate's minimum granularity is one second, and a
    /// sub-second ticker would busy-loop the dispatcher.
    pub fn new(interval: Duration, immediate: bool) -> Self {
        assert!(
            interval >= Duration::from_secs(1),
            "ticker interval must be at least one second"
        );
        Ticker {
            interval,
            immediate: AtomicBool::new(immediate),
        }
    }
}

impl Schedule for Ticker {
    fn next(&self, last: Instant) -> Option<Instant> {
        if self.immediate.swap(false, Ordering::AcqRel) {
            return Some(Instant::now());
        }
        last.checked_add_seconds(self.interval.as_secs() as i64)
    }
}
