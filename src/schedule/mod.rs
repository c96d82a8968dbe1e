//! Schedule generators: the cron engine, a fixed-interval ticker, and a
//! one-shot at-time schedule, sharing a single behavioural contract.

pub mod at;
pub mod cron;
pub mod ticker;

use crate::civil::Instant;

/// Produces a stream of future fire times from a reference instant.
///
/// `next(last)` must be idempotent for equal `last` inputs (a cron or
/// ticker schedule recomputes the same answer every time it's asked from
/// the same reference). Returning `None` marks the schedule terminal — it
/// will never be asked again by a well-behaved caller, but if it is, it
/// must keep returning `None`.
pub trait Schedule: Send + Sync {
    fn next(&self, last: Instant) -> Option<Instant>;
}
