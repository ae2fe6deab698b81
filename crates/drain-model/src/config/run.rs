use std::time::Duration;

use crate::{AdmissionPolicy, ConfigError};

const DEFAULT_QUEUE_KEY: &str = "async_tasks";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_CONCURRENCY: usize = 5;
const ERROR_BACKOFF_FACTOR: u32 = 5;

/// Immutable configuration of one consumer run.
///
/// Every field has a default, so callers only override what they need:
/// ```
/// use std::time::Duration;
/// use drain_model::{AdmissionPolicy, RunConfig};
///
/// let cfg = RunConfig::default()
///     .with_queue_key("mail")
///     .with_max_concurrency(3)
///     .with_policy(AdmissionPolicy::WorkerPool)
///     .with_poll_interval(Duration::from_millis(250));
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.effective_error_backoff(), Duration::from_millis(1250));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Identifies which external FIFO to drain.
    pub queue_key: String,
    /// Sleep between polls while the queue is observed empty.
    pub poll_interval: Duration,
    /// Hard ceiling on admissions for this run; `None` means unlimited.
    pub max_jobs: Option<u64>,
    /// Ceiling on simultaneously running job actions.
    pub max_concurrency: usize,
    pub policy: AdmissionPolicy,
    /// Worker-pool buffer size; defaults to `max_concurrency`.
    pub buffer_capacity: Option<usize>,
    /// Sleep after a backend failure; defaults to five poll intervals.
    pub error_backoff: Option<Duration>,
    /// Per-job execution limit; `None` lets actions run to completion.
    pub job_timeout: Option<Duration>,
    /// Consecutive backend failures tolerated before the run gives up.
    pub max_backend_errors: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_jobs: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            policy: AdmissionPolicy::default(),
            buffer_capacity: None,
            error_backoff: None,
            job_timeout: None,
            max_backend_errors: None,
        }
    }
}

impl RunConfig {
    pub fn with_queue_key(mut self, key: impl Into<String>) -> Self {
        self.queue_key = key.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_jobs(mut self, max_jobs: u64) -> Self {
        self.max_jobs = Some(max_jobs);
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_policy(mut self, policy: AdmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = Some(backoff);
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn with_max_backend_errors(mut self, attempts: u32) -> Self {
        self.max_backend_errors = Some(attempts);
        self
    }

    #[inline]
    pub fn effective_buffer_capacity(&self) -> usize {
        self.buffer_capacity.unwrap_or(self.max_concurrency)
    }

    /// Saturates instead of overflowing for very long poll intervals.
    #[inline]
    pub fn effective_error_backoff(&self) -> Duration {
        self.error_backoff
            .unwrap_or_else(|| self.poll_interval.saturating_mul(ERROR_BACKOFF_FACTOR))
    }

    /// Returns `true` once `processed` admissions exhaust the job ceiling.
    #[inline]
    pub fn limit_reached(&self, processed: u64) -> bool {
        self.max_jobs.is_some_and(|max| processed >= max)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_key.trim().is_empty() {
            return Err(ConfigError::EmptyQueueKey);
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.max_jobs == Some(0) {
            return Err(ConfigError::ZeroMaxJobs);
        }
        if self.buffer_capacity == Some(0) {
            return Err(ConfigError::ZeroBuffer);
        }
        if self.error_backoff.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroDuration("error backoff"));
        }
        if self.job_timeout.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroDuration("job timeout"));
        }
        Ok(())
    }
}
