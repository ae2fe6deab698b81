use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a job inside one consumer run.
///
/// `Pending -> Admitted -> Running -> Completed`, or `Pending -> Rejected` when the
/// run's job ceiling was already reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    /// Decoded and waiting for admission.
    Pending,
    /// Holds an admission slot (or sits in the worker-pool buffer).
    Admitted,
    /// Its action is executing.
    Running,
    /// The action returned; see [`JobOutcome`] for how.
    Completed,
    /// Never started because the job ceiling was reached.
    Rejected,
}

impl JobStatus {
    /// Returns `true` if the job won't transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Rejected)
    }

    /// Returns `true` while the job still counts against the run.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending | JobStatus::Admitted | JobStatus::Running
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Admitted => "admitted",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a completed job's action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobOutcome {
    Succeeded,
    /// The action returned an error.
    Failed,
    /// The action exceeded the configured per-job timeout.
    TimedOut,
    /// The action panicked; the slot was still released.
    Panicked,
}

impl JobOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }

    /// Short label used for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
            JobOutcome::TimedOut => "timed_out",
            JobOutcome::Panicked => "panicked",
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
