use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{JobKind, SequenceId};

/// Structured job body as carried in the `data` field of a queue item.
pub type Payload = Map<String, Value>;

/// One decoded unit of work pulled from the queue.
///
/// Jobs are immutable once decoded; the consumer only re-stamps the sequence
/// number, which produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    kind: JobKind,
    payload: Payload,
    sequence_id: SequenceId,
}

impl Job {
    /// Builds an unsequenced job (`sequence_id == 0`).
    pub fn new(kind: impl Into<JobKind>, payload: Payload) -> Self {
        Self {
            kind: kind.into(),
            payload,
            sequence_id: 0,
        }
    }

    /// Returns the same job stamped with the given run sequence.
    #[must_use]
    pub fn with_sequence(mut self, sequence_id: SequenceId) -> Self {
        self.sequence_id = sequence_id;
        self
    }

    #[inline]
    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn sequence_id(&self) -> SequenceId {
        self.sequence_id
    }

    /// Looks up a single field of the payload.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}
