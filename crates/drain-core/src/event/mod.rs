//! Consumer lifecycle events.
//!
//! The loop and its job tasks publish [`Event`]s to every registered
//! [`Subscribe`] implementation. Logging and metrics live behind this seam, so
//! the loop itself never decides how an error is surfaced.

use std::{fmt, sync::Arc, time::Duration, time::SystemTime};

use async_trait::async_trait;
use drain_model::{Job, JobKind, JobOutcome, SequenceId};

/// Bytes of a dropped payload kept in [`Event::raw`].
pub const RAW_PREVIEW_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // run
    ConsumerStarted,
    ConsumerStopped,
    MaxJobsReached,
    DrainStarted,
    DrainCompleted,

    // polling
    QueueEmpty,
    BackendFailed,
    BackendRecovered,
    DecodeFailed,

    // job lifecycle
    JobRejected,
    JobAdmitted,
    JobStarting,
    JobSucceeded,
    JobFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ConsumerStarted => "consumer_started",
            EventKind::ConsumerStopped => "consumer_stopped",
            EventKind::MaxJobsReached => "max_jobs_reached",
            EventKind::DrainStarted => "drain_started",
            EventKind::DrainCompleted => "drain_completed",
            EventKind::QueueEmpty => "queue_empty",
            EventKind::BackendFailed => "backend_failed",
            EventKind::BackendRecovered => "backend_recovered",
            EventKind::DecodeFailed => "decode_failed",
            EventKind::JobRejected => "job_rejected",
            EventKind::JobAdmitted => "job_admitted",
            EventKind::JobStarting => "job_starting",
            EventKind::JobSucceeded => "job_succeeded",
            EventKind::JobFailed => "job_failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation from the consumer. Optional fields are filled where they
/// make sense for the kind.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub at: SystemTime,
    pub queue: Option<String>,
    pub sequence_id: Option<SequenceId>,
    pub job_kind: Option<JobKind>,
    pub action: Option<String>,
    pub outcome: Option<JobOutcome>,
    pub reason: Option<String>,
    /// Actions executing when the event was emitted.
    pub in_flight: Option<usize>,
    /// Admissions so far in this run.
    pub processed: Option<u64>,
    pub elapsed: Option<Duration>,
    pub delay: Option<Duration>,
    /// Consecutive backend failures.
    pub attempt: Option<u32>,
    /// Lossy, truncated text of a payload that could not be decoded.
    pub raw: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            at: SystemTime::now(),
            queue: None,
            sequence_id: None,
            job_kind: None,
            action: None,
            outcome: None,
            reason: None,
            in_flight: None,
            processed: None,
            elapsed: None,
            delay: None,
            attempt: None,
            raw: None,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_job(mut self, job: &Job) -> Self {
        self.sequence_id = Some(job.sequence_id());
        self.job_kind = Some(job.kind().clone());
        self
    }

    pub fn with_sequence(mut self, sequence_id: SequenceId) -> Self {
        self.sequence_id = Some(sequence_id);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_outcome(mut self, outcome: JobOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_reason(mut self, reason: impl fmt::Display) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn with_in_flight(mut self, in_flight: usize) -> Self {
        self.in_flight = Some(in_flight);
        self
    }

    pub fn with_processed(mut self, processed: u64) -> Self {
        self.processed = Some(processed);
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Keeps the first [`RAW_PREVIEW_LIMIT`] bytes of `raw`, with invalid UTF-8
    /// replaced.
    pub fn with_raw(mut self, raw: &[u8]) -> Self {
        let head = &raw[..raw.len().min(RAW_PREVIEW_LIMIT)];
        self.raw = Some(String::from_utf8_lossy(head).into_owned());
        self
    }
}

/// Receives consumer events.
///
/// Called inline from the loop and from job tasks, so implementations should
/// return quickly and must not panic.
#[async_trait]
pub trait Subscribe: Send + Sync {
    async fn on_event(&self, event: &Event);

    fn name(&self) -> &'static str;
}

/// Fan-out to a fixed set of subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<[Arc<dyn Subscribe>]>,
}

impl EventBus {
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            subscribers: subscribers.into(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub async fn emit(&self, event: Event) {
        for subscriber in self.subscribers.iter() {
            subscriber.on_event(&event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn bus_fans_out_to_every_subscriber() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let bus = EventBus::new(vec![a.clone(), b.clone()]);

        bus.emit(Event::new(EventKind::QueueEmpty)).await;
        bus.emit(Event::new(EventKind::DrainStarted)).await;

        let expected = [EventKind::QueueEmpty, EventKind::DrainStarted];
        assert_eq!(*a.0.lock().unwrap(), expected);
        assert_eq!(*b.0.lock().unwrap(), expected);
    }

    #[test]
    fn raw_preview_is_bounded_and_lossy() {
        let mut raw = vec![0xff];
        raw.extend(std::iter::repeat_n(b'x', 1000));
        let event = Event::new(EventKind::DecodeFailed).with_raw(&raw);

        let preview = event.raw.unwrap();
        assert!(preview.starts_with('\u{fffd}'));
        assert_eq!(preview.chars().filter(|c| *c == 'x').count(), RAW_PREVIEW_LIMIT - 1);
    }

    #[test]
    fn with_job_copies_identity() {
        let job = Job::new("email", Default::default()).with_sequence(12);
        let event = Event::new(EventKind::JobAdmitted).with_job(&job);

        assert_eq!(event.sequence_id, Some(12));
        assert_eq!(event.job_kind.as_ref().map(JobKind::as_str), Some("email"));
    }
}
