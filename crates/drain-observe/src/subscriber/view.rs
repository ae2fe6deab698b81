use std::borrow::Borrow;

use drain_core::{Event, EventKind};
use tracing::{debug, error, info, warn};

/// Field accessors with placeholders for values an event does not carry.
pub trait View {
    fn kind(&self) -> EventKind;
    fn as_queue(&self) -> &str;
    fn as_job_kind(&self) -> &str;
    fn as_action(&self) -> &str;
    fn as_reason(&self) -> &str;
    fn as_outcome(&self) -> &str;
    fn as_raw(&self) -> &str;
    fn seq(&self) -> u64;
    fn attempt(&self) -> u32;
    fn in_flight(&self) -> usize;
    fn processed(&self) -> u64;
    fn elapsed_ms(&self) -> u64;
    fn delay_ms(&self) -> u64;
}

impl<T> View for T
where
    T: Borrow<Event>,
{
    #[inline]
    fn kind(&self) -> EventKind {
        self.borrow().kind
    }
    #[inline]
    fn as_queue(&self) -> &str {
        self.borrow().queue.as_deref().unwrap_or("-")
    }
    #[inline]
    fn as_job_kind(&self) -> &str {
        self.borrow()
            .job_kind
            .as_ref()
            .map_or("-", |kind| kind.as_str())
    }
    #[inline]
    fn as_action(&self) -> &str {
        self.borrow().action.as_deref().unwrap_or("-")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.borrow().reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn as_outcome(&self) -> &str {
        self.borrow().outcome.map_or("-", |o| o.as_str())
    }
    #[inline]
    fn as_raw(&self) -> &str {
        self.borrow().raw.as_deref().unwrap_or("")
    }
    #[inline]
    fn seq(&self) -> u64 {
        self.borrow().sequence_id.unwrap_or(0)
    }
    #[inline]
    fn attempt(&self) -> u32 {
        self.borrow().attempt.unwrap_or(0)
    }
    #[inline]
    fn in_flight(&self) -> usize {
        self.borrow().in_flight.unwrap_or(0)
    }
    #[inline]
    fn processed(&self) -> u64 {
        self.borrow().processed.unwrap_or(0)
    }
    #[inline]
    fn elapsed_ms(&self) -> u64 {
        millis(self.borrow().elapsed)
    }
    #[inline]
    fn delay_ms(&self) -> u64 {
        millis(self.borrow().delay)
    }
}

fn millis(d: Option<std::time::Duration>) -> u64 {
    d.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // run
        EventKind::ConsumerStarted => "consumer started",
        EventKind::ConsumerStopped => "consumer stopped",
        EventKind::MaxJobsReached => "job ceiling reached; no further admissions",
        EventKind::DrainStarted => "draining; waiting for admitted jobs",
        EventKind::DrainCompleted => "drain completed",

        // polling
        EventKind::QueueEmpty => "queue empty; sleeping",
        EventKind::BackendFailed => "queue backend failed; backing off",
        EventKind::BackendRecovered => "queue backend recovered",
        EventKind::DecodeFailed => "malformed payload dropped",

        // job lifecycle
        EventKind::JobRejected => "job rejected before start",
        EventKind::JobAdmitted => "job admitted",
        EventKind::JobStarting => "job starting",
        EventKind::JobSucceeded => "job completed",
        EventKind::JobFailed => "job failed",
    }
}

#[inline]
pub fn log_event<E: View>(e: E) {
    let msg = message_for(e.kind());

    match e.kind() {
        // run
        EventKind::ConsumerStarted => info!(queue = e.as_queue(), "{msg}"),
        EventKind::ConsumerStopped => {
            info!(queue = e.as_queue(), processed = e.processed(), "{msg}")
        }
        EventKind::MaxJobsReached => info!(processed = e.processed(), "{msg}"),
        EventKind::DrainStarted => info!(outstanding = e.in_flight(), "{msg}"),
        EventKind::DrainCompleted => debug!(processed = e.processed(), "{msg}"),

        // polling
        EventKind::QueueEmpty => debug!(
            queue = e.as_queue(),
            in_flight = e.in_flight(),
            delay_ms = e.delay_ms(),
            "{msg}"
        ),
        EventKind::BackendFailed => error!(
            queue = e.as_queue(),
            attempt = e.attempt(),
            delay_ms = e.delay_ms(),
            reason = e.as_reason(),
            "{msg}"
        ),
        EventKind::BackendRecovered => {
            info!(queue = e.as_queue(), failures = e.attempt(), "{msg}")
        }
        EventKind::DecodeFailed => {
            warn!(seq = e.seq(), reason = e.as_reason(), raw = e.as_raw(), "{msg}")
        }

        // job lifecycle
        EventKind::JobRejected => {
            warn!(seq = e.seq(), kind = e.as_job_kind(), reason = e.as_reason(), "{msg}")
        }
        EventKind::JobAdmitted => info!(
            seq = e.seq(),
            kind = e.as_job_kind(),
            action = e.as_action(),
            in_flight = e.in_flight(),
            "{msg}"
        ),
        EventKind::JobStarting => {
            debug!(seq = e.seq(), kind = e.as_job_kind(), action = e.as_action(), "{msg}")
        }
        EventKind::JobSucceeded => info!(
            seq = e.seq(),
            kind = e.as_job_kind(),
            elapsed_ms = e.elapsed_ms(),
            "{msg}"
        ),
        EventKind::JobFailed => error!(
            seq = e.seq(),
            kind = e.as_job_kind(),
            action = e.as_action(),
            outcome = e.as_outcome(),
            elapsed_ms = e.elapsed_ms(),
            reason = e.as_reason(),
            "{msg}"
        ),
    }
}
