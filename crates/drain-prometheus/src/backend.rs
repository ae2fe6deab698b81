use async_trait::async_trait;
use drain_core::{Event, EventKind, Subscribe};
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

const JOB_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0];

/// Prometheus view of a consumer run.
///
/// Cloning is cheap; clones share the same registry and collectors.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    jobs_admitted: IntCounterVec,
    jobs_completed: IntCounterVec,
    job_duration: HistogramVec,
    jobs_in_flight: IntGauge,
    jobs_rejected: IntCounter,
    decode_failures: IntCounter,
    backend_errors: IntCounter,
}

impl PrometheusMetrics {
    /// Collectors registered in a fresh, private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Registers the collectors in `registry`.
    ///
    /// Fails with `AlreadyReg` if this registry already carries drain metrics.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let jobs_admitted = IntCounterVec::new(
            Opts::new("drain_jobs_admitted_total", "Jobs admitted to the governor"),
            &["kind"],
        )?;
        let jobs_completed = IntCounterVec::new(
            Opts::new("drain_jobs_completed_total", "Jobs whose action finished"),
            &["kind", "outcome"],
        )?;
        let job_duration = HistogramVec::new(
            HistogramOpts::new("drain_job_duration_seconds", "Action execution time")
                .buckets(JOB_DURATION_BUCKETS.to_vec()),
            &["kind"],
        )?;
        let jobs_in_flight = IntGauge::new("drain_jobs_in_flight", "Actions executing now")?;
        let jobs_rejected = IntCounter::new(
            "drain_jobs_rejected_total",
            "Decoded jobs that were never started",
        )?;
        let decode_failures = IntCounter::new(
            "drain_decode_failures_total",
            "Queue items dropped as malformed",
        )?;
        let backend_errors = IntCounter::new(
            "drain_backend_errors_total",
            "Failed queue backend calls",
        )?;

        registry.register(Box::new(jobs_admitted.clone()))?;
        registry.register(Box::new(jobs_completed.clone()))?;
        registry.register(Box::new(job_duration.clone()))?;
        registry.register(Box::new(jobs_in_flight.clone()))?;
        registry.register(Box::new(jobs_rejected.clone()))?;
        registry.register(Box::new(decode_failures.clone()))?;
        registry.register(Box::new(backend_errors.clone()))?;

        Ok(Self {
            registry,
            jobs_admitted,
            jobs_completed,
            job_duration,
            jobs_in_flight,
            jobs_rejected,
            decode_failures,
            backend_errors,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Current values in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    fn record(&self, e: &Event) {
        let kind = e.job_kind.as_ref().map_or("unknown", |k| k.as_str());

        match e.kind {
            EventKind::JobAdmitted => self.jobs_admitted.with_label_values(&[kind]).inc(),
            EventKind::JobStarting => self.jobs_in_flight.inc(),
            EventKind::JobSucceeded | EventKind::JobFailed => {
                self.jobs_in_flight.dec();
                let outcome = e.outcome.map_or("unknown", |o| o.as_str());
                self.jobs_completed
                    .with_label_values(&[kind, outcome])
                    .inc();
                if let Some(elapsed) = e.elapsed {
                    self.job_duration
                        .with_label_values(&[kind])
                        .observe(elapsed.as_secs_f64());
                }
            }
            EventKind::JobRejected => self.jobs_rejected.inc(),
            EventKind::DecodeFailed => self.decode_failures.inc(),
            EventKind::BackendFailed => self.backend_errors.inc(),
            EventKind::ConsumerStarted
            | EventKind::ConsumerStopped
            | EventKind::MaxJobsReached
            | EventKind::DrainStarted
            | EventKind::DrainCompleted
            | EventKind::QueueEmpty
            | EventKind::BackendRecovered => {}
        }
    }
}

#[async_trait]
impl Subscribe for PrometheusMetrics {
    async fn on_event(&self, event: &Event) {
        self.record(event);
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}
