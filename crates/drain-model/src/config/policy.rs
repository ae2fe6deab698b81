use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How the consumer turns popped jobs into running actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdmissionPolicy {
    /// Start each job as soon as a slot is free; the loop blocks on the first
    /// completion when all slots are taken.
    #[default]
    EagerCap,
    /// Hand jobs to a fixed set of long-lived workers through a bounded buffer;
    /// the loop blocks only when the buffer is full.
    WorkerPool,
}

impl AdmissionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionPolicy::EagerCap => "eager",
            AdmissionPolicy::WorkerPool => "pool",
        }
    }
}

impl fmt::Display for AdmissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdmissionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "eager" | "eager-cap" | "eager_cap" | "semaphore" => Ok(AdmissionPolicy::EagerCap),
            "pool" | "worker-pool" | "worker_pool" | "workers" => Ok(AdmissionPolicy::WorkerPool),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}
