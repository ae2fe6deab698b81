use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown admission policy: {0} (expected: eager|pool)")]
    UnknownPolicy(String),
    #[error("queue key must not be empty")]
    EmptyQueueKey,
    #[error("max concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    #[error("max jobs must be at least 1 when set")]
    ZeroMaxJobs,
    #[error("worker-pool buffer capacity must be at least 1")]
    ZeroBuffer,
    #[error("{0} must be greater than zero when set")]
    ZeroDuration(&'static str),
}
