//! The consumer loop.
//!
//! One control flow polls the queue, decodes, dispatches and admits; the jobs
//! themselves run concurrently under the [`Governor`]. The loop moves through
//! [`LoopPhase`]s which callers can watch, and ends in a drain that waits for
//! every admitted job.

use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use drain_model::{AdmissionPolicy, JobStatus, RunConfig, SequenceId};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    decode::decode,
    error::ConsumerError,
    event::{Event, EventBus, EventKind, Subscribe},
    governor::Governor,
    identity::consumer_id,
    queue::QueueClient,
    registry::HandlerRegistry,
    state::JobLedger,
};

mod job;
use job::{Completions, JobRun};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopPhase {
    Idle,
    Polling,
    /// Sleeping after an empty poll or a backend failure.
    BackoffWait,
    Decoding,
    Dispatching,
    Draining,
    Stopped,
}

/// Totals of one run, available after the drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Jobs admitted to the governor.
    pub processed: u64,
    pub succeeded: u64,
    /// Jobs whose action errored, timed out or panicked.
    pub failed: u64,
    pub decode_failures: u64,
    pub rejected: u64,
    pub backend_errors: u64,
    /// Highest number of actions that executed at the same time.
    pub peak_in_flight: usize,
}

pub struct Consumer {
    queue: Arc<dyn QueueClient>,
    registry: Arc<HandlerRegistry>,
    config: RunConfig,
    ledger: JobLedger,
    subscribers: Vec<Arc<dyn Subscribe>>,
    phase: watch::Sender<LoopPhase>,
}

impl Consumer {
    /// Validates `config` and wires the consumer. Nothing is polled until [`run`](Self::run).
    pub fn new(
        queue: Arc<dyn QueueClient>,
        registry: Arc<HandlerRegistry>,
        config: RunConfig,
    ) -> Result<Self, ConsumerError> {
        config.validate()?;
        let (phase, _) = watch::channel(LoopPhase::Idle);
        Ok(Self {
            queue,
            registry,
            config,
            ledger: JobLedger::new(),
            subscribers: Vec::new(),
            phase,
        })
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Replaces the ledger, e.g. to share one with a status reporter.
    pub fn with_ledger(mut self, ledger: JobLedger) -> Self {
        self.ledger = ledger;
        self
    }

    #[inline]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handle on the per-job records of this consumer.
    pub fn ledger(&self) -> JobLedger {
        self.ledger.clone()
    }

    pub fn phase(&self) -> watch::Receiver<LoopPhase> {
        self.phase.subscribe()
    }

    /// Runs until `shutdown` fires, the job ceiling is reached, or the backend
    /// fails more often in a row than `max_backend_errors` allows.
    ///
    /// Every exit path drains: admitted jobs always run to completion before
    /// this returns.
    #[instrument(
        name = "consumer",
        skip_all,
        fields(id = consumer_id(), queue = %self.config.queue_key, backend = self.queue.name())
    )]
    pub async fn run(self, shutdown: CancellationToken) -> Result<RunReport, ConsumerError> {
        let Self {
            queue,
            registry,
            config,
            ledger,
            subscribers,
            phase,
        } = self;

        let events = EventBus::new(subscribers);
        let mut governor = Governor::from_config(&config);
        let completions = Arc::new(Completions::default());
        let key = config.queue_key.as_str();

        let mut report = RunReport::default();
        let mut sequence: SequenceId = 0;
        let mut consecutive_failures: u32 = 0;

        events
            .emit(Event::new(EventKind::ConsumerStarted).with_queue(key))
            .await;

        let exit = loop {
            if shutdown.is_cancelled() {
                debug!("shutdown requested");
                break Ok(());
            }
            if config.limit_reached(report.processed) {
                events
                    .emit(
                        Event::new(EventKind::MaxJobsReached)
                            .with_queue(key)
                            .with_processed(report.processed),
                    )
                    .await;
                break Ok(());
            }

            phase.send_replace(LoopPhase::Polling);
            let item = match queue.pop(key).await {
                Ok(item) => {
                    if consecutive_failures > 0 {
                        events
                            .emit(
                                Event::new(EventKind::BackendRecovered)
                                    .with_queue(key)
                                    .with_attempt(consecutive_failures),
                            )
                            .await;
                        consecutive_failures = 0;
                    }
                    item
                }
                Err(err) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    report.backend_errors += 1;

                    let delay = config.effective_error_backoff();
                    events
                        .emit(
                            Event::new(EventKind::BackendFailed)
                                .with_queue(key)
                                .with_reason(&err)
                                .with_attempt(consecutive_failures)
                                .with_delay(delay),
                        )
                        .await;

                    if config
                        .max_backend_errors
                        .is_some_and(|max| consecutive_failures >= max)
                    {
                        break Err(ConsumerError::BackendExhausted {
                            attempts: consecutive_failures,
                            last: err,
                        });
                    }

                    phase.send_replace(LoopPhase::BackoffWait);
                    if pause(delay, &shutdown).await {
                        break Ok(());
                    }
                    continue;
                }
            };

            let Some(raw) = item else {
                events
                    .emit(
                        Event::new(EventKind::QueueEmpty)
                            .with_queue(key)
                            .with_in_flight(governor.in_flight())
                            .with_delay(config.poll_interval),
                    )
                    .await;

                phase.send_replace(LoopPhase::BackoffWait);
                if governor.policy() == AdmissionPolicy::WorkerPool {
                    governor.flush().await;
                }
                if pause(config.poll_interval, &shutdown).await {
                    break Ok(());
                }
                continue;
            };

            sequence += 1;
            phase.send_replace(LoopPhase::Decoding);
            let job = match decode(&raw) {
                Ok(job) => job.with_sequence(sequence),
                Err(err) => {
                    report.decode_failures += 1;
                    events
                        .emit(
                            Event::new(EventKind::DecodeFailed)
                                .with_queue(key)
                                .with_sequence(sequence)
                                .with_reason(&err)
                                .with_raw(&raw),
                        )
                        .await;
                    continue;
                }
            };

            phase.send_replace(LoopPhase::Dispatching);
            let action = registry.dispatch(&job);
            let kind = job.kind().clone();
            ledger.insert_pending(sequence, kind.clone());

            let admitted = Event::new(EventKind::JobAdmitted)
                .with_job(&job)
                .with_action(action.name());
            let work = JobRun {
                job,
                action,
                timeout: config.job_timeout,
                ledger: ledger.clone(),
                events: events.clone(),
                slots: governor.slots(),
                completions: Arc::clone(&completions),
            }
            .into_work();

            match governor.admit(work).await {
                Ok(()) => {
                    report.processed += 1;
                    ledger.advance(sequence, JobStatus::Admitted);
                    events
                        .emit(
                            admitted
                                .with_processed(report.processed)
                                .with_in_flight(governor.in_flight()),
                        )
                        .await;
                }
                Err(err) => {
                    report.rejected += 1;
                    ledger.reject(sequence, kind, err.to_string());
                    let rejected = Event::new(EventKind::JobRejected)
                        .with_sequence(sequence)
                        .with_reason(err);
                    events.emit(rejected).await;
                }
            }
        };

        phase.send_replace(LoopPhase::Draining);
        events
            .emit(Event::new(EventKind::DrainStarted).with_in_flight(governor.outstanding()))
            .await;

        let slots = governor.slots();
        governor.drain().await;

        report.succeeded = completions.succeeded.load(Ordering::Acquire);
        report.failed = completions.failed.load(Ordering::Acquire);
        report.peak_in_flight = slots.peak();

        events
            .emit(Event::new(EventKind::DrainCompleted).with_processed(report.processed))
            .await;
        phase.send_replace(LoopPhase::Stopped);
        events
            .emit(
                Event::new(EventKind::ConsumerStopped)
                    .with_queue(key)
                    .with_processed(report.processed),
            )
            .await;

        debug!(?report, "consumer stopped");
        exit.map(|()| report)
    }
}

/// Sleeps for `delay`; returns `true` if `shutdown` fired first.
async fn pause(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
