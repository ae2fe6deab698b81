//! Queue client seam.
//!
//! The consumer only needs a non-blocking `pop`; `push` exists for seeders and
//! tests. Backends are expected to make `pop` atomic on their side, so no
//! client-side locking is layered on top.

use async_trait::async_trait;

use crate::error::BackendError;

mod memory;
pub use memory::MemoryQueue;

/// Bytes of one queue item as stored by the backend.
pub type RawPayload = Vec<u8>;

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Removes and returns the oldest item under `key`, or `None` when empty.
    ///
    /// Must not block waiting for items; the consumer decides when to sleep.
    async fn pop(&self, key: &str) -> Result<Option<RawPayload>, BackendError>;

    /// Appends an item under `key`.
    async fn push(&self, key: &str, payload: RawPayload) -> Result<(), BackendError>;
}
