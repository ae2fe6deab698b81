use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tracing::trace;

use super::{QueueClient, RawPayload};
use crate::error::BackendError;

/// In-process queue with list semantics: `push` prepends, `pop` takes from the
/// tail, so items come out in the order they went in.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    lists: Arc<Mutex<HashMap<String, VecDeque<RawPayload>>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently stored under `key`.
    pub fn len(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    /// Synchronous push, handy when seeding before the runtime starts.
    pub fn push_now(&self, key: &str, payload: impl Into<RawPayload>) {
        self.lock()
            .entry(key.to_string())
            .or_default()
            .push_front(payload.into());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<RawPayload>>> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn pop(&self, key: &str) -> Result<Option<RawPayload>, BackendError> {
        let item = self.lock().get_mut(key).and_then(VecDeque::pop_back);
        trace!(key, hit = item.is_some(), "memory queue pop");
        Ok(item)
    }

    async fn push(&self, key: &str, payload: RawPayload) -> Result<(), BackendError> {
        self.push_now(key, payload);
        Ok(())
    }
}
