//! Prometheus metrics for the drain consumer.
//!
//! [`PrometheusMetrics`] is a [`drain_core::Subscribe`] implementation: register
//! it on a [`Consumer`](drain_core::Consumer) and it turns lifecycle events into
//! counters, a gauge and a duration histogram.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use drain_core::{Consumer, HandlerRegistry, MemoryQueue};
//! use drain_model::RunConfig;
//! use drain_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = Arc::new(PrometheusMetrics::new()?);
//! let consumer = Consumer::new(
//!     Arc::new(MemoryQueue::new()),
//!     Arc::new(HandlerRegistry::default()),
//!     RunConfig::default(),
//! )?
//! .with_subscriber(metrics.clone());
//!
//! // later, e.g. from a /metrics handler
//! let text = metrics.encode_text()?;
//! # drop(consumer);
//! # let _ = text;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `drain_jobs_admitted_total{kind}` - Counter
//! - `drain_jobs_completed_total{kind, outcome}` - Counter
//! - `drain_job_duration_seconds{kind}` - Histogram
//! - `drain_jobs_in_flight` - Gauge
//! - `drain_jobs_rejected_total` - Counter
//! - `drain_decode_failures_total` - Counter
//! - `drain_backend_errors_total` - Counter
//!
//! This crate does not serve HTTP; expose [`PrometheusMetrics::encode_text`]
//! through whatever server the application already runs.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
