use std::time::Duration;

use drain_model::ConfigError;
use thiserror::Error;

/// A raw queue item could not be turned into a job.
///
/// The consumer logs and drops such items; they are never retried.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not valid json: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("payload must be a json object, got {0}")]
    NotAnObject(&'static str),
    #[error("`data` must be a json object, got {0}")]
    DataNotAnObject(&'static str),
}

/// A job action did not complete successfully.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("handler exceeded timeout of {0:?}")]
    TimedOut(Duration),
    #[error("handler panicked: {0}")]
    Panicked(String),
    #[error("handler was cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(String),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed(reason.into())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        HandlerError::Io(e.to_string())
    }
}

/// The queue backend itself misbehaved (connectivity, protocol).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("queue backend unavailable: {0}")]
    Unavailable(String),
    #[error("queue backend protocol error: {0}")]
    Protocol(String),
}

/// Errors that end a consumer run early.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("invalid run configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("queue backend failed {attempts} times in a row; last error: {last}")]
    BackendExhausted { attempts: u32, last: BackendError },
}
