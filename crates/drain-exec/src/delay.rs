use std::time::Duration;

use async_trait::async_trait;
use drain_core::{Action, HandlerError};
use drain_model::Job;
use serde_json::Value;
use tracing::{debug, info};

/// Simulated work: logs the job body, then sleeps for a fixed duration.
#[derive(Debug, Clone)]
pub struct DelayAction {
    name: String,
    duration: Duration,
}

impl DelayAction {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[async_trait]
impl Action for DelayAction {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, job: &Job) -> Result<(), HandlerError> {
        let data = Value::Object(job.payload().clone());
        info!(
            seq = job.sequence_id(),
            kind = %job.kind(),
            action = %self.name,
            %data,
            "processing job"
        );
        tokio::time::sleep(self.duration).await;
        debug!(seq = job.sequence_id(), "job processed");
        Ok(())
    }
}
