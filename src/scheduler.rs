//! The scheduling loop: keeps jobs ordered by next-fire time, sleeps
//! until the earliest, and dispatches due jobs onto independent tasks.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt as _;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::civil::{Instant, Offset};
use crate::errors::{CronError, JobError, SchedulerError};
use crate::job::{Job, JobFn, State};
use crate::schedule::at::At;
use crate::schedule::cron::CronSchedule;
use crate::schedule::ticker::Ticker;
use crate::schedule::Schedule;
use crate::sink::Sink;

/// A point-in-time copy of a job's identity and transient state, returned
/// by [`Scheduler::jobs`].
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub id: String,
    pub state: State,
    pub delay: bool,
    pub prev: Option<Instant>,
    pub next: Option<Instant>,
    pub error: Option<JobError>,
}

/// A cancellation handle returned by every `register*` call. Dropping it
/// does nothing; the job keeps running until [`JobHandle::remove`] is
/// called explicitly.
pub struct JobHandle {
    jobs: Arc<Mutex<Vec<Arc<Job>>>>,
    next_scheduled: Arc<Notify>,
    exit_schedule: Arc<Notify>,
    job: Arc<Job>,
}

impl JobHandle {
    /// Removes the job from the scheduler and wakes the dispatcher so the
    /// removal is honored immediately rather than on the next natural
    /// wakeup.
    pub async fn remove(&self) {
        let mut jobs = self.jobs.lock().await;
        jobs.retain(|j| !Arc::ptr_eq(j, &self.job));
        drop(jobs);
        self.next_scheduled.notify_one();
        self.exit_schedule.notify_one();
    }
}

/// Owns the registered jobs and drives the dispatch loop.
pub struct Scheduler {
    offset: Offset,
    error_sink: Arc<dyn Sink>,
    info_sink: Arc<dyn Sink>,
    jobs: Arc<Mutex<Vec<Arc<Job>>>>,
    next_scheduled: Arc<Notify>,
    exit_schedule: Arc<Notify>,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(offset: Offset, error_sink: Arc<dyn Sink>, info_sink: Arc<dyn Sink>) -> Self {
        Scheduler {
            offset,
            error_sink,
            info_sink,
            jobs: Arc::new(Mutex::new(Vec::new())),
            next_scheduled: Arc::new(Notify::new()),
            exit_schedule: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Registers a job behind an arbitrary [`Schedule`]. If the dispatcher
    /// is already running, the job is initialized immediately and the
    /// loop is woken to pick it up on its very next cycle.
    pub async fn register(
        &self,
        id: impl Into<String>,
        f: JobFn,
        schedule: Box<dyn Schedule>,
        delay: bool,
    ) -> JobHandle {
        let job = Arc::new(Job::new(id.into(), schedule, f, delay));

        {
            let mut jobs = self.jobs.lock().await;
            jobs.push(job.clone());
        }

        if self.running.load(AtomicOrdering::Acquire) {
            job.init(Instant::now()).await;
            self.signal_reschedule();
        }

        JobHandle {
            jobs: self.jobs.clone(),
            next_scheduled: self.next_scheduled.clone(),
            exit_schedule: self.exit_schedule.clone(),
            job,
        }
    }

    /// Parses `expr` and registers the resulting cron schedule. `@reboot`
    /// is handled specially: it registers a one-shot [`At`] schedule that
    /// fires once, at registration time.
    pub async fn register_cron(
        &self,
        id: impl Into<String>,
        f: JobFn,
        expr: &str,
        delay: bool,
    ) -> Result<JobHandle, CronError> {
        if expr.trim() == "@reboot" {
            // `@reboot` fires once, at registration time — materialize
            // `next` right here rather than waiting on `register`'s
            // running-only init, otherwise a job registered before `serve`
            // is called would sit with `next = None` until the next cycle.
            // The one-shot `At` schedule consumes its target the first
            // time `next` is called, so this must be the only call.
            let now = Instant::now();
            let schedule: Box<dyn Schedule> = Box::new(At::new(now));
            let job = Arc::new(Job::new(id.into(), schedule, f, delay));
            job.init(now).await;

            {
                let mut jobs = self.jobs.lock().await;
                jobs.push(job.clone());
            }
            if self.running.load(AtomicOrdering::Acquire) {
                self.signal_reschedule();
            }

            return Ok(JobHandle {
                jobs: self.jobs.clone(),
                next_scheduled: self.next_scheduled.clone(),
                exit_schedule: self.exit_schedule.clone(),
                job,
            });
        }

        let schedule = CronSchedule::parse(expr, self.offset)?;
        Ok(self.register(id, f, Box::new(schedule), delay).await)
    }

    pub async fn register_tick(
        &self,
        id: impl Into<String>,
        f: JobFn,
        interval: Duration,
        immediate: bool,
        delay: bool,
    ) -> JobHandle {
        let schedule: Box<dyn Schedule> = Box::new(Ticker::new(interval, immediate));
        self.register(id, f, schedule, delay).await
    }

    pub async fn register_at(
        &self,
        id: impl Into<String>,
        f: JobFn,
        instant: Instant,
        delay: bool,
    ) -> JobHandle {
        let schedule: Box<dyn Schedule> = Box::new(At::new(instant));
        self.register(id, f, schedule, delay).await
    }

    /// A point-in-time snapshot of every registered job, sorted by id.
    pub async fn jobs(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.lock().await;
        let mut snapshots = Vec::with_capacity(jobs.len());
        for job in jobs.iter() {
            snapshots.push(JobSnapshot {
                id: job.id().to_string(),
                state: job.state().await,
                delay: job.delay(),
                prev: job.prev().await,
                next: job.next().await,
                error: job.error().await,
            });
        }
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    fn signal_reschedule(&self) {
        self.next_scheduled.notify_one();
        self.exit_schedule.notify_one();
    }

    /// Runs the dispatch loop until `cancel` fires. Does not wait for
    /// in-flight job workers before returning.
    pub async fn serve(&self, cancel: CancellationToken) -> Result<(), SchedulerError> {
        self.running.store(true, AtomicOrdering::Release);

        let now = Instant::now();
        {
            let jobs = self.jobs.lock().await;
            for job in jobs.iter() {
                job.init(now).await;
            }
        }
        self.next_scheduled.notify_one();

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Err(SchedulerError::Cancelled),
                _ = self.next_scheduled.notified() => {
                    self.schedule_once(&cancel).await;
                    self.next_scheduled.notify_one();
                }
            }
        };

        self.running.store(false, AtomicOrdering::Release);
        result
    }

    /// One cycle of the inner scheduling algorithm: sort, compute the
    /// wait duration, sleep (abortable by cancellation or a fresh
    /// registration/removal), then dispatch everything that's due.
    async fn schedule_once(&self, cancel: &CancellationToken) {
        let wait_until = {
            let mut jobs = self.jobs.lock().await;

            let mut keyed = Vec::with_capacity(jobs.len());
            for job in jobs.iter() {
                let next = job.next().await;
                keyed.push((job.clone(), next));
            }
            keyed.sort_by(|(_, a), (_, b)| compare_next(*a, *b));
            *jobs = keyed.iter().map(|(job, _)| job.clone()).collect();

            keyed.first().and_then(|(_, next)| *next)
        };

        let now = Instant::now();
        let dur = match wait_until {
            Some(next) => next.duration_since(now).unwrap_or(Duration::ZERO),
            // no jobs, or every job is terminal: wake periodically anyway
            // so a job registered in the meantime is picked up promptly.
            None => Duration::from_secs(60),
        };

        if dur > Duration::ZERO {
            let sleep = tokio::time::sleep(dur);
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep => {}
                _ = self.exit_schedule.notified() => return,
            }
        }

        self.dispatch_due().await;

        // drain a stale exit_schedule permit (e.g. posted by a
        // registration that arrived mid-dispatch) so the next cycle's
        // wait isn't aborted for no reason.
        let _ = self.exit_schedule.notified().now_or_never();
    }

    async fn dispatch_due(&self) {
        let now = Instant::now();
        let jobs: Vec<Arc<Job>> = self.jobs.lock().await.clone();

        for job in jobs {
            let next = match job.next().await {
                Some(next) => next,
                None => break,
            };
            if next > now {
                break;
            }

            if job.delay() && job.state().await == State::Running {
                continue;
            }

            job.calc_state(now).await;

            let error_sink = self.error_sink.clone();
            let info_sink = self.info_sink.clone();
            tokio::spawn(async move {
                job.run(now, error_sink, info_sink).await;
            });
        }
    }
}

fn compare_next(a: Option<Instant>, b: Option<Instant>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrd};
    use std::time::Duration as StdDuration;

    fn counting_job() -> (JobFn, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let f: JobFn = Arc::new(move |_| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, AtomicOrd::SeqCst);
                Ok(())
            })
        });
        (f, count)
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_fires_expected_number_of_times() {
        let scheduler = Scheduler::new(Offset::Utc, Arc::new(NullSink), Arc::new(NullSink));
        let (f, count) = counting_job();
        scheduler
            .register_tick("tick", f, StdDuration::from_secs(1), true, false)
            .await;

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move { scheduler.serve(cancel_clone).await });

        tokio::time::advance(StdDuration::from_millis(10)).await;
        tokio::time::advance(StdDuration::from_secs(5)).await;
        tokio::task::yield_now().await;

        cancel.cancel();
        let _ = handle.await;

        assert!(count.load(AtomicOrd::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn removal_prevents_further_dispatch() {
        let scheduler = Scheduler::new(Offset::Utc, Arc::new(NullSink), Arc::new(NullSink));
        let (f, _count) = counting_job();
        let handle = scheduler
            .register_tick("tick", f, StdDuration::from_secs(5), false, false)
            .await;

        handle.remove().await;
        let snapshots = scheduler.jobs().await;
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn jobs_snapshot_sorted_by_id() {
        let scheduler = Scheduler::new(Offset::Utc, Arc::new(NullSink), Arc::new(NullSink));
        let (f1, _) = counting_job();
        let (f2, _) = counting_job();
        scheduler
            .register_at("zzz", f1, Instant::from_unix_seconds(10), false)
            .await;
        scheduler
            .register_at("aaa", f2, Instant::from_unix_seconds(10), false)
            .await;

        let snapshots = scheduler.jobs().await;
        let ids: Vec<_> = snapshots.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec!["aaa".to_string(), "zzz".to_string()]);
    }

    #[tokio::test]
    async fn cancellation_returns_promptly() {
        let scheduler = Scheduler::new(Offset::Utc, Arc::new(NullSink), Arc::new(NullSink));
        let (f, _count) = counting_job();
        scheduler
            .register_at("once", f, Instant::from_unix_seconds(i64::MAX / 2), false)
            .await;

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        cancel_clone.cancel();

        let result = tokio::time::timeout(StdDuration::from_secs(5), scheduler.serve(cancel))
            .await
            .expect("serve should return promptly after cancellation");
        assert_eq!(result, Err(SchedulerError::Cancelled));
    }

    #[tokio::test]
    async fn reboot_directive_registers_a_one_shot_job() {
        let scheduler = Scheduler::new(Offset::Utc, Arc::new(NullSink), Arc::new(NullSink));
        let (f, count) = counting_job();
        scheduler
            .register_cron("boot", f, "@reboot", false)
            .await
            .unwrap();

        let snapshots = scheduler.jobs().await;
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].next.is_some());
        let _ = count;
    }
}
