use std::{
    any::Any,
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use drain_model::{Job, JobOutcome, JobStatus};
use tokio::{
    task::{JoinError, JoinHandle},
    time::Instant,
};

use crate::{
    error::HandlerError,
    event::{Event, EventBus, EventKind},
    governor::{SlotTracker, Work},
    registry::Action,
    state::JobLedger,
};

/// Completion counters shared by every job task of a run.
#[derive(Debug, Default)]
pub(super) struct Completions {
    pub(super) succeeded: AtomicU64,
    pub(super) failed: AtomicU64,
}

impl Completions {
    fn record(&self, outcome: JobOutcome) {
        let counter = if outcome.is_success() {
            &self.succeeded
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything an admitted job needs to run and report on itself.
pub(super) struct JobRun {
    pub(super) job: Job,
    pub(super) action: Arc<dyn Action>,
    pub(super) timeout: Option<Duration>,
    pub(super) ledger: JobLedger,
    pub(super) events: EventBus,
    pub(super) slots: Arc<SlotTracker>,
    pub(super) completions: Arc<Completions>,
}

impl JobRun {
    pub(super) fn into_work(self) -> Work {
        Box::pin(self.execute())
    }

    async fn execute(self) {
        let Self {
            job,
            action,
            timeout,
            ledger,
            events,
            slots,
            completions,
        } = self;
        let seq = job.sequence_id();
        let action_name = action.name().to_string();

        ledger.advance(seq, JobStatus::Running);
        events
            .emit(
                Event::new(EventKind::JobStarting)
                    .with_job(&job)
                    .with_action(action_name.as_str())
                    .with_in_flight(slots.in_flight()),
            )
            .await;

        let started = Instant::now();
        let result = run_action(action, job.clone(), timeout).await;
        let elapsed = started.elapsed();

        let (outcome, error) = match &result {
            Ok(()) => (JobOutcome::Succeeded, None),
            Err(HandlerError::TimedOut(_)) => (JobOutcome::TimedOut, result.as_ref().err()),
            Err(HandlerError::Panicked(_)) => (JobOutcome::Panicked, result.as_ref().err()),
            Err(_) => (JobOutcome::Failed, result.as_ref().err()),
        };

        ledger.complete(seq, outcome, error.map(ToString::to_string));
        completions.record(outcome);

        let event = Event::new(if outcome.is_success() {
            EventKind::JobSucceeded
        } else {
            EventKind::JobFailed
        })
        .with_job(&job)
        .with_action(action_name)
        .with_outcome(outcome)
        .with_elapsed(elapsed);
        let event = match error {
            Some(err) => event.with_reason(err),
            None => event,
        };
        events.emit(event).await;
    }
}

/// Runs `action` on its own task so a panic or an expired timeout is turned into
/// a [`HandlerError`] instead of unwinding through the caller.
async fn run_action(
    action: Arc<dyn Action>,
    job: Job,
    timeout: Option<Duration>,
) -> Result<(), HandlerError> {
    let mut task = AbortOnDrop(tokio::spawn(async move { action.run(&job).await }));

    let joined = match timeout {
        None => (&mut task).await,
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            // `task` is dropped on return, which aborts the action.
            Err(_) => return Err(HandlerError::TimedOut(limit)),
        },
    };

    joined.unwrap_or_else(|e| Err(join_error(e)))
}

fn join_error(e: JoinError) -> HandlerError {
    if e.is_panic() {
        HandlerError::Panicked(panic_message(e.into_panic()))
    } else {
        HandlerError::Cancelled
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Join handle that aborts its task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drain_model::{JobKind, Payload};

    struct Scripted(Result<(), HandlerError>, Duration);

    #[async_trait]
    impl Action for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn run(&self, _job: &Job) -> Result<(), HandlerError> {
            tokio::time::sleep(self.1).await;
            self.0.clone()
        }
    }

    struct Panics;

    #[async_trait]
    impl Action for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        async fn run(&self, _job: &Job) -> Result<(), HandlerError> {
            panic!("handler blew up")
        }
    }

    fn job() -> Job {
        Job::new("email", Payload::new()).with_sequence(1)
    }

    async fn execute(action: Arc<dyn Action>, timeout: Option<Duration>) -> JobLedger {
        let ledger = JobLedger::new();
        ledger.insert_pending(1, JobKind::from("email"));
        JobRun {
            job: job(),
            action,
            timeout,
            ledger: ledger.clone(),
            events: EventBus::default(),
            slots: Arc::new(SlotTracker::new(1)),
            completions: Arc::new(Completions::default()),
        }
        .into_work()
        .await;
        ledger
    }

    #[tokio::test(start_paused = true)]
    async fn success_is_recorded() {
        let ledger = execute(Arc::new(Scripted(Ok(()), Duration::from_millis(5))), None).await;
        let info = ledger.get(1).unwrap();
        assert_eq!(info.status, JobStatus::Completed);
        assert_eq!(info.outcome, Some(JobOutcome::Succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn handler_error_is_recorded() {
        let action = Scripted(Err(HandlerError::failed("smtp down")), Duration::ZERO);
        let ledger = execute(Arc::new(action), None).await;

        let info = ledger.get(1).unwrap();
        assert_eq!(info.outcome, Some(JobOutcome::Failed));
        assert_eq!(info.error.as_deref(), Some("handler failed: smtp down"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_enforced() {
        let action = Scripted(Ok(()), Duration::from_secs(60));
        let ledger = execute(Arc::new(action), Some(Duration::from_secs(1))).await;

        assert_eq!(ledger.get(1).unwrap().outcome, Some(JobOutcome::TimedOut));
    }

    #[tokio::test]
    async fn aborted_task_maps_to_cancelled() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let err = task.await.unwrap_err();

        assert_eq!(join_error(err), HandlerError::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_handler_is_recorded_as_failure() {
        let action = Scripted(Err(HandlerError::Cancelled), Duration::ZERO);
        let ledger = execute(Arc::new(action), None).await;

        let info = ledger.get(1).unwrap();
        assert_eq!(info.outcome, Some(JobOutcome::Failed));
        assert_eq!(info.error.as_deref(), Some("handler was cancelled"));
    }

    #[tokio::test]
    async fn panic_becomes_outcome() {
        let ledger = execute(Arc::new(Panics), None).await;
        let info = ledger.get(1).unwrap();

        assert_eq!(info.outcome, Some(JobOutcome::Panicked));
        assert!(info.error.unwrap().contains("handler blew up"));
    }
}
