use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{JobKind, JobOutcome, JobStatus, SequenceId};

/// Ledger record for a job that reached admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub sequence_id: SequenceId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Set once the job is `Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
    #[serde(with = "time_serde")]
    pub admitted_at: SystemTime,
    #[serde(with = "time_serde")]
    pub updated_at: SystemTime,
    /// Handler error text for failed, timed out or panicked jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobInfo {
    pub fn admitted(sequence_id: SequenceId, kind: JobKind) -> Self {
        let now = SystemTime::now();
        Self {
            sequence_id,
            kind,
            status: JobStatus::Admitted,
            outcome: None,
            admitted_at: now,
            updated_at: now,
            error: None,
        }
    }
}

mod time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = time
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?;
        u64::try_from(since_epoch.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_millis(millis))
    }
}
