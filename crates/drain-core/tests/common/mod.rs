#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use drain_core::{
    Action, BackendError, Event, EventKind, HandlerError, MemoryQueue, QueueClient, RawPayload,
    Subscribe,
};
use drain_model::{Job, SequenceId};
use serde_json::json;
use tokio::time::Instant;

pub const KEY: &str = "async_tasks";

/// Queue item in the wire format producers use.
pub fn payload(kind: &str, duration_secs: f64) -> Vec<u8> {
    json!({
        "type": kind,
        "data": { "duration": duration_secs, "message": format!("{kind} job") }
    })
    .to_string()
    .into_bytes()
}

/// Action that sleeps for the job's `duration` and records concurrency.
#[derive(Default)]
pub struct Witness {
    current: AtomicUsize,
    peak: AtomicUsize,
    seen: Mutex<Vec<SequenceId>>,
}

impl Witness {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Sequence ids in the order actions started.
    pub fn seen(&self) -> Vec<SequenceId> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Action for Witness {
    fn name(&self) -> &str {
        "witness"
    }

    async fn run(&self, job: &Job) -> Result<(), HandlerError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().unwrap().push(job.sequence_id());

        let secs = job
            .field("duration")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Failing;

#[async_trait]
impl Action for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&self, _job: &Job) -> Result<(), HandlerError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Err(HandlerError::failed("downstream rejected the job"))
    }
}

pub struct Panicking;

#[async_trait]
impl Action for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn run(&self, _job: &Job) -> Result<(), HandlerError> {
        panic!("action bug")
    }
}

/// Wraps a [`MemoryQueue`], counting pops and failing the first `fail_first`
/// of them (or all of them when `fail_first == u32::MAX`).
pub struct FlakyQueue {
    pub inner: MemoryQueue,
    fail_first: u32,
    pops: AtomicU32,
    pop_times: Mutex<Vec<Instant>>,
}

impl FlakyQueue {
    pub fn new(inner: MemoryQueue, fail_first: u32) -> Self {
        Self {
            inner,
            fail_first,
            pops: AtomicU32::new(0),
            pop_times: Mutex::new(Vec::new()),
        }
    }

    pub fn pops(&self) -> u32 {
        self.pops.load(Ordering::SeqCst)
    }

    pub fn pop_times(&self) -> Vec<Instant> {
        self.pop_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueClient for FlakyQueue {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn pop(&self, key: &str) -> Result<Option<RawPayload>, BackendError> {
        let n = self.pops.fetch_add(1, Ordering::SeqCst);
        self.pop_times.lock().unwrap().push(Instant::now());
        if n < self.fail_first {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        self.inner.pop(key).await
    }

    async fn push(&self, key: &str, payload: RawPayload) -> Result<(), BackendError> {
        self.inner.push(key, payload).await
    }
}

/// Subscriber that keeps every event kind it sees.
#[derive(Default)]
pub struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    pub fn kinds(&self) -> Vec<EventKind> {
        self.0.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.0.lock().unwrap().iter().filter(|e| e.kind == kind).count()
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.0.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

pub fn witness() -> Arc<Witness> {
    Arc::new(Witness::default())
}
