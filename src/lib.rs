//! `schedulus` is an in-process task scheduler: a six-field cron engine
//! (with seconds) on top of a concurrent dispatch loop.
//!
//! Three schedule generators share one contract
//! ([`schedule::Schedule::next`]): [`schedule::cron::CronSchedule`] parses
//! cron expressions, [`schedule::ticker::Ticker`] fires at a fixed
//! interval, and [`schedule::at::At`] fires once. Register jobs against a
//! [`scheduler::Scheduler`] and drive it with [`scheduler::Scheduler::serve`]
//! on your own `tokio` runtime — this crate never spins up a runtime of
//! its own.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use schedulus::{civil::Offset, sink::NullSink, Scheduler};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let scheduler = Scheduler::new(Offset::Utc, Arc::new(NullSink), Arc::new(NullSink));
//! scheduler
//!     .register_tick("heartbeat", Arc::new(|_| Box::pin(async { Ok(()) })), Duration::from_secs(30), true, true)
//!     .await;
//!
//! let cancel = CancellationToken::new();
//! let _ = scheduler.serve(cancel).await;
//! # }
//! ```

pub mod bitfield;
pub mod civil;
pub mod errors;
pub mod field;
pub mod job;
pub mod parse;
pub mod schedule;
pub mod scheduler;
pub mod sink;

pub use errors::{CronError, JobError, SchedulerError};
pub use job::{Job, JobFn, State};
pub use schedule::at::At;
pub use schedule::cron::CronSchedule;
pub use schedule::ticker::Ticker;
pub use schedule::Schedule;
pub use scheduler::{JobHandle, JobSnapshot, Scheduler};
pub use sink::{NullSink, Sink, TracingSink};
