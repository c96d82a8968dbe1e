//! Error taxonomy. Parser errors are returned to the registering caller;
//! job errors never abort the dispatcher and are only observable through
//! [`crate::job::Job::error`] and the configured [`crate::sink::Sink`].

/// Raised by [`crate::parse::parse`] / [`crate::schedule::cron::CronSchedule::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    #[error("empty cron expression")]
    Empty,
    #[error("unknown directive: {0}")]
    UnknownDirective(String),
    #[error("expected 6 fields, found {0}")]
    WrongFieldCount(usize),
    #[error("invalid integer: {0}")]
    InvalidInteger(String),
    #[error("value {value} out of range {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },
    #[error("duplicate value {0} in field")]
    Duplicate(i64),
    #[error("all six fields are `*`")]
    AllAsterisk,
}

/// Captured on a [`crate::job::Job`] when its job function fails or panics.
/// Never propagated to the scheduler's caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),
    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Returned by [`crate::scheduler::Scheduler::serve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler cancelled")]
    Cancelled,
}
