use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::{
    sync::{Mutex, Notify, mpsc},
    task::JoinSet,
};
use tracing::{trace, warn};

use super::{AdmissionError, SlotTracker, Work, log_join};

/// Worker-pool admission: `capacity` long-lived workers share one bounded buffer.
pub(super) struct WorkerPool {
    tx: mpsc::Sender<Work>,
    workers: JoinSet<()>,
    backlog: Arc<Backlog>,
}

/// Admitted-but-unfinished counter with an idle notification.
#[derive(Default)]
struct Backlog {
    outstanding: AtomicUsize,
    idle: Notify,
}

struct BacklogGuard(Arc<Backlog>);

impl Backlog {
    fn enter(self: &Arc<Self>) -> BacklogGuard {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        BacklogGuard(Arc::clone(self))
    }

    async fn wait_idle(&self) {
        loop {
            // Registered on creation, so a notify between the check and the
            // await is not lost.
            let notified = self.idle.notified();
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for BacklogGuard {
    fn drop(&mut self) {
        if self.0.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl WorkerPool {
    pub(super) fn new(slots: Arc<SlotTracker>, buffer_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Work>(buffer_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = JoinSet::new();

        for worker_id in 1..=slots.capacity() {
            let rx = Arc::clone(&rx);
            let slots = Arc::clone(&slots);
            workers.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(work) = next else {
                        trace!(worker_id, "buffer closed; worker exiting");
                        break;
                    };
                    let slot = slots.try_enter();
                    if slot.is_none() {
                        warn!(worker_id, "slot tracker saturated inside worker");
                    }
                    // Run on its own task so a panic cannot take the worker down.
                    if let Err(e) = tokio::spawn(work).await {
                        warn!(worker_id, error = %e, "work panicked inside worker");
                    }
                    drop(slot);
                }
            });
        }

        Self {
            tx,
            workers,
            backlog: Arc::new(Backlog::default()),
        }
    }

    pub(super) fn outstanding(&self) -> usize {
        self.backlog.outstanding.load(Ordering::Acquire)
    }

    pub(super) async fn admit(&mut self, work: Work) -> Result<(), AdmissionError> {
        let guard = self.backlog.enter();
        let work: Work = Box::pin(async move {
            let _done = guard;
            work.await;
        });
        // Blocks while the buffer is full; a rejected send drops the guard.
        self.tx.send(work).await.map_err(|_| AdmissionError::Closed)
    }

    pub(super) async fn flush(&mut self) {
        self.backlog.wait_idle().await;
    }

    pub(super) async fn drain(self) {
        let Self {
            tx,
            mut workers,
            backlog,
        } = self;
        drop(tx);
        while let Some(res) = workers.join_next().await {
            log_join(res);
        }
        backlog.wait_idle().await;
    }
}
