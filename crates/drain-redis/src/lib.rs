//! Redis list backend for the drain consumer.
//!
//! Producers `LPUSH` payloads onto a list; [`RedisQueue::pop`] takes them from
//! the other end with `RPOP`, so items come out in the order they were pushed.
//! `RPOP` is atomic on the server, which is what lets several consumers share
//! one list without client-side locking.

use async_trait::async_trait;
use drain_core::{BackendError, QueueClient, RawPayload};
use redis::{Client, RedisError, aio::ConnectionManager};
use tracing::{debug, trace};

/// [`QueueClient`] over a Redis list.
///
/// Cloning shares the underlying connection manager, which reconnects on its
/// own after the server goes away.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
}

impl RedisQueue {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let client = Client::open(url)
            .map_err(|e| BackendError::Unavailable(format!("invalid redis url {url:?}: {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(backend_error)?;
        debug!(url, "redis queue connected");
        Ok(Self { conn })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Number of items waiting under `key`.
    pub async fn len(&self, key: &str) -> Result<usize, BackendError> {
        let mut conn = self.conn.clone();
        redis::cmd("LLEN")
            .arg(key)
            .query_async::<usize>(&mut conn)
            .await
            .map_err(backend_error)
    }

    /// Drops every item under `key`.
    pub async fn clear(&self, key: &str) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(backend_error)
    }
}

#[async_trait]
impl QueueClient for RedisQueue {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn pop(&self, key: &str) -> Result<Option<RawPayload>, BackendError> {
        let mut conn = self.conn.clone();
        let item = redis::cmd("RPOP")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(backend_error)?;
        trace!(key, hit = item.is_some(), "redis rpop");
        Ok(item)
    }

    async fn push(&self, key: &str, payload: RawPayload) -> Result<(), BackendError> {
        let mut conn = self.conn.clone();
        redis::cmd("LPUSH")
            .arg(key)
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(backend_error)
    }
}

/// Connectivity problems are retryable; everything else is a protocol error.
fn backend_error(e: RedisError) -> BackendError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        BackendError::Unavailable(e.to_string())
    } else {
        BackendError::Protocol(e.to_string())
    }
}
