//! Admission control.
//!
//! A [`Governor`] owns the admission slots of a run and guarantees that no more
//! than `max_concurrency` pieces of [`Work`] execute at any instant. Two policies
//! share that guarantee:
//!
//! - **eager-cap**: work starts as soon as it is admitted; when every slot is taken
//!   `admit` waits for the first running job to finish.
//! - **worker-pool**: a fixed set of workers pull from a bounded buffer; `admit`
//!   returns once the work is buffered and waits only while the buffer is full.
//!   More jobs may be buffered than `max_concurrency`, never more executing.

use std::{future::Future, pin::Pin, sync::Arc};

use drain_model::{AdmissionPolicy, RunConfig};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error};

mod eager;
use eager::EagerCap;

mod pool;
use pool::WorkerPool;

mod slot;
pub use slot::{SlotGuard, SlotTracker};

/// One admitted job, ready to execute.
pub type Work = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("governor is closed; no further admissions")]
    Closed,
}

pub struct Governor {
    policy: AdmissionPolicy,
    slots: Arc<SlotTracker>,
    inner: Inner,
}

enum Inner {
    Eager(EagerCap),
    Pool(WorkerPool),
}

impl Governor {
    /// Builds the governor described by `cfg`.
    ///
    /// The worker-pool policy spawns its workers immediately, so this must be
    /// called from within a tokio runtime.
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self::new(
            cfg.policy,
            cfg.max_concurrency,
            cfg.effective_buffer_capacity(),
        )
    }

    pub fn new(policy: AdmissionPolicy, max_concurrency: usize, buffer_capacity: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        let slots = Arc::new(SlotTracker::new(max_concurrency));
        let inner = match policy {
            AdmissionPolicy::EagerCap => Inner::Eager(EagerCap::new(Arc::clone(&slots))),
            AdmissionPolicy::WorkerPool => Inner::Pool(WorkerPool::new(
                Arc::clone(&slots),
                buffer_capacity.max(1),
            )),
        };
        debug!(%policy, max_concurrency, buffer_capacity, "governor ready");
        Self {
            policy,
            slots,
            inner,
        }
    }

    #[inline]
    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// Shared view of the executing-action counter.
    #[inline]
    pub fn slots(&self) -> Arc<SlotTracker> {
        Arc::clone(&self.slots)
    }

    #[inline]
    pub fn in_flight(&self) -> usize {
        self.slots.in_flight()
    }

    /// Work admitted but not yet finished (buffered plus executing).
    pub fn outstanding(&self) -> usize {
        match &self.inner {
            Inner::Eager(eager) => eager.outstanding(),
            Inner::Pool(pool) => pool.outstanding(),
        }
    }

    /// Admits `work`, waiting for capacity as the policy dictates.
    ///
    /// Once this returns `Ok`, the work will run to completion and release its
    /// slot exactly once. On `Err` the work has been dropped unstarted.
    pub async fn admit(&mut self, work: Work) -> Result<(), AdmissionError> {
        match &mut self.inner {
            Inner::Eager(eager) => eager.admit(work).await,
            Inner::Pool(pool) => pool.admit(work).await,
        }
    }

    /// Waits until everything admitted so far has finished. Admission stays open.
    pub async fn flush(&mut self) {
        match &mut self.inner {
            Inner::Eager(eager) => eager.flush().await,
            Inner::Pool(pool) => pool.flush().await,
        }
    }

    /// Stops admissions and joins all admitted work.
    pub async fn drain(self) {
        match self.inner {
            Inner::Eager(eager) => eager.drain().await,
            Inner::Pool(pool) => pool.drain().await,
        }
        debug!(peak = self.slots.peak(), "governor drained");
    }
}

/// Logs a join failure of governor-owned tasks. Work futures catch action panics
/// themselves, so reaching this means the bookkeeping around an action panicked.
pub(crate) fn log_join(res: Result<(), JoinError>) {
    if let Err(e) = res
        && !e.is_cancelled()
    {
        error!(error = %e, "governor task terminated abnormally");
    }
}
