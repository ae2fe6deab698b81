use std::sync::Arc;

use tokio::{
    sync::{Semaphore, TryAcquireError},
    task::JoinSet,
};
use tracing::{trace, warn};

use super::{AdmissionError, SlotTracker, Work, log_join};

/// Eager-cap admission: one semaphore permit per executing job.
pub(super) struct EagerCap {
    permits: Arc<Semaphore>,
    running: JoinSet<()>,
    slots: Arc<SlotTracker>,
}

impl EagerCap {
    pub(super) fn new(slots: Arc<SlotTracker>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(slots.capacity())),
            running: JoinSet::new(),
            slots,
        }
    }

    pub(super) fn outstanding(&self) -> usize {
        self.running.len()
    }

    pub(super) async fn admit(&mut self, work: Work) -> Result<(), AdmissionError> {
        self.reap();

        let permit = loop {
            match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => break permit,
                Err(TryAcquireError::Closed) => return Err(AdmissionError::Closed),
                Err(TryAcquireError::NoPermits) => {
                    trace!(
                        running = self.running.len(),
                        "all slots busy; waiting for first completion"
                    );
                    match self.running.join_next().await {
                        Some(res) => log_join(res),
                        // Nothing left to wait on, yet no permit: block on the
                        // semaphore itself rather than spin.
                        None => {
                            break Arc::clone(&self.permits)
                                .acquire_owned()
                                .await
                                .map_err(|_| AdmissionError::Closed)?;
                        }
                    }
                }
            }
        };

        let slots = Arc::clone(&self.slots);
        self.running.spawn(async move {
            let _permit = permit;
            let slot = slots.try_enter();
            if slot.is_none() {
                warn!("slot tracker saturated while holding a permit");
            }
            work.await;
            drop(slot);
        });
        Ok(())
    }

    pub(super) async fn flush(&mut self) {
        while let Some(res) = self.running.join_next().await {
            log_join(res);
        }
    }

    pub(super) async fn drain(mut self) {
        self.permits.close();
        self.flush().await;
    }

    /// Collects finished tasks without waiting.
    fn reap(&mut self) {
        while let Some(res) = self.running.try_join_next() {
            log_join(res);
        }
    }
}
