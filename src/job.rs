//! Job records: a schedule generator, a job function, a delay flag, and
//! the transient state the scheduler mutates across dispatch cycles.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::RwLock;

use crate::civil::Instant;
use crate::errors::JobError;
use crate::schedule::Schedule;
use crate::sink::Sink;

/// The user-supplied job body. Invoked with the instant it was scheduled
/// for, not the instant it actually started running.
pub type JobFn = Arc<dyn Fn(Instant) -> BoxFuture<'static, Result<(), JobError>> + Send + Sync>;

/// A job's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Running,
    Failed,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Stopped => "stopped",
            State::Running => "running",
            State::Failed => "failed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`State::from_str`] for unrecognized text.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid job state: {0}")]
pub struct InvalidState(pub String);

impl FromStr for State {
    type Err = InvalidState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(State::Stopped),
            "running" => Ok(State::Running),
            "failed" => Ok(State::Failed),
            other => Err(InvalidState(other.to_string())),
        }
    }
}

struct Transient {
    state: State,
    error: Option<JobError>,
    prev: Option<Instant>,
    next: Option<Instant>,
}

/// A registered task: immutable identity/schedule/body/delay-flag, plus
/// transient state guarded by a reader/writer lock.
pub struct Job {
    id: String,
    schedule: Box<dyn Schedule>,
    f: JobFn,
    delay: bool,
    transient: RwLock<Transient>,
}

impl Job {
    pub fn new(id: String, schedule: Box<dyn Schedule>, f: JobFn, delay: bool) -> Self {
        Job {
            id,
            schedule,
            f,
            delay,
            transient: RwLock::new(Transient {
                state: State::Stopped,
                error: None,
                prev: None,
                next: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn delay(&self) -> bool {
        self.delay
    }

    pub async fn state(&self) -> State {
        self.transient.read().await.state
    }

    pub async fn error(&self) -> Option<JobError> {
        self.transient.read().await.error.clone()
    }

    pub async fn prev(&self) -> Option<Instant> {
        self.transient.read().await.prev
    }

    pub async fn next(&self) -> Option<Instant> {
        self.transient.read().await.next
    }

    /// Computes and stores the job's initial `next` fire time.
    pub async fn init(&self, now: Instant) {
        let next = self.schedule.next(now);
        self.transient.write().await.next = next;
    }

    /// Atomic pre-dispatch transition: `state -> running`, `prev <- next`,
    /// `next <- schedule.next(now)`. Called by the scheduler *before*
    /// spawning the worker task, so a re-entrant schedule cycle observes
    /// the advanced `next` and never relaunches the same firing.
    pub async fn calc_state(&self, now: Instant) {
        let mut t = self.transient.write().await;
        t.state = State::Running;
        t.prev = t.next;
        t.next = self.schedule.next(now);
    }

    /// Runs the job body under a panic guard, updates state and the
    /// logged error, then recomputes `next` from the actual completion
    /// time (the "delay" semantics fall out of this recomputation, not of
    /// any special-casing here — see [`crate::scheduler::Scheduler`]).
    pub async fn run(self: Arc<Self>, at: Instant, error_sink: Arc<dyn Sink>, info_sink: Arc<dyn Sink>) {
        info_sink.log(&format!("start job {} at {}", self.id, at));

        let outcome = AssertUnwindSafe((self.f)(at)).catch_unwind().await;

        let (state, error) = match outcome {
            Ok(Ok(())) => (State::Stopped, None),
            Ok(Err(err)) => {
                error_sink.log(&err.to_string());
                (State::Failed, Some(err))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error_sink.log(&message);
                (State::Failed, Some(JobError::Panicked(message)))
            }
        };

        let next = self.schedule.next(Instant::now());

        let mut t = self.transient.write().await;
        t.state = state;
        t.error = error;
        t.next = next;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::at::At;
    use crate::sink::NullSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop_schedule(target: Instant) -> Box<dyn Schedule> {
        Box::new(At::new(target))
    }

    #[test]
    fn state_round_trips_through_text() {
        for state in [State::Stopped, State::Running, State::Failed] {
            let text = state.as_str();
            assert_eq!(text.parse::<State>().unwrap(), state);
        }
        assert!("bogus".parse::<State>().is_err());
    }

    #[tokio::test]
    async fn init_computes_next_from_schedule() {
        let target = Instant::from_unix_seconds(100);
        let job = Job::new(
            "j".to_string(),
            noop_schedule(target),
            Arc::new(|_| Box::pin(async { Ok(()) })),
            false,
        );
        job.init(Instant::from_unix_seconds(0)).await;
        assert_eq!(job.next().await, Some(target));
    }

    #[tokio::test]
    async fn calc_state_advances_prev_and_next_before_run() {
        let target = Instant::from_unix_seconds(100);
        let job = Job::new(
            "j".to_string(),
            noop_schedule(target),
            Arc::new(|_| Box::pin(async { Ok(()) })),
            false,
        );
        job.init(Instant::from_unix_seconds(0)).await;
        job.calc_state(Instant::from_unix_seconds(100)).await;
        assert_eq!(job.state().await, State::Running);
        assert_eq!(job.prev().await, Some(target));
        // the at-schedule is one-shot: recomputing `next` after firing
        // yields the terminal sentinel.
        assert_eq!(job.next().await, None);
    }

    #[tokio::test]
    async fn run_success_sets_stopped() {
        let job = Arc::new(Job::new(
            "j".to_string(),
            noop_schedule(Instant::from_unix_seconds(0)),
            Arc::new(|_| Box::pin(async { Ok(()) })),
            false,
        ));
        job.clone()
            .run(Instant::now(), Arc::new(NullSink), Arc::new(NullSink))
            .await;
        assert_eq!(job.state().await, State::Stopped);
        assert!(job.error().await.is_none());
    }

    #[tokio::test]
    async fn run_failure_sets_failed_and_records_error() {
        let job = Arc::new(Job::new(
            "j".to_string(),
            noop_schedule(Instant::from_unix_seconds(0)),
            Arc::new(|_| Box::pin(async { Err(JobError::Failed("boom".to_string())) })),
            false,
        ));
        job.clone()
            .run(Instant::now(), Arc::new(NullSink), Arc::new(NullSink))
            .await;
        assert_eq!(job.state().await, State::Failed);
        assert!(matches!(job.error().await, Some(JobError::Failed(_))));
    }

    #[tokio::test]
    async fn run_panic_is_captured_not_propagated() {
        let job = Arc::new(Job::new(
            "j".to_string(),
            noop_schedule(Instant::from_unix_seconds(0)),
            Arc::new(|_| Box::pin(async { panic!("job exploded") })),
            false,
        ));
        job.clone()
            .run(Instant::now(), Arc::new(NullSink), Arc::new(NullSink))
            .await;
        assert_eq!(job.state().await, State::Failed);
        assert!(matches!(job.error().await, Some(JobError::Panicked(_))));
    }

    #[tokio::test]
    async fn invocation_count_matches_run_calls() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let job = Arc::new(Job::new(
            "j".to_string(),
            noop_schedule(Instant::from_unix_seconds(0)),
            Arc::new(move |_| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
            false,
        ));
        job.clone()
            .run(Instant::now(), Arc::new(NullSink), Arc::new(NullSink))
            .await;
        job.clone()
            .run(Instant::now(), Arc::new(NullSink), Arc::new(NullSink))
            .await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
