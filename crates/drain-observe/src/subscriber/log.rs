use async_trait::async_trait;
use drain_core::{Event, Subscribe};

use crate::subscriber::view::log_event;

/// Writes every consumer event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSubscriber;

impl LogSubscriber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogSubscriber {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
