//! Bounded-concurrency queue consumer.
//!
//! The [`Consumer`] drains raw payloads from a [`QueueClient`], turns them into
//! [`Job`](drain_model::Job)s with [`decode`], picks an [`Action`] from the
//! [`HandlerRegistry`] and hands the resulting work to a [`Governor`] that never
//! lets more than `max_concurrency` actions execute at once.

pub mod error;
pub use error::{BackendError, ConsumerError, DecodeError, HandlerError};

mod decode;
pub use decode::{decode, encode};

pub mod queue;
pub use queue::{MemoryQueue, QueueClient, RawPayload};

pub mod registry;
pub use registry::{Action, HandlerRegistry, NoopAction};

pub mod governor;
pub use governor::{AdmissionError, Governor, SlotTracker, Work};

pub mod state;
pub use state::JobLedger;

pub mod event;
pub use event::{Event, EventBus, EventKind, RAW_PREVIEW_LIMIT, Subscribe};

pub mod consumer;
pub use consumer::{Consumer, LoopPhase, RunReport};

mod identity;
pub use identity::consumer_id;
