use std::{fmt, future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use drain_core::{Action, HandlerError};
use drain_model::Job;
use tracing::trace;

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;
type Handler = Arc<dyn Fn(Job) -> BoxFuture + Send + Sync>;

/// Action backed by an async closure.
///
/// The closure receives an owned copy of the job, so it can move it into the
/// returned future.
///
/// ```
/// use drain_exec::FnAction;
///
/// let action = FnAction::new("audit", |job| async move {
///     println!("seen {}", job.kind());
///     Ok(())
/// });
/// ```
#[derive(Clone)]
pub struct FnAction {
    name: String,
    handler: Handler,
}

impl FnAction {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |job| Box::pin(f(job))),
        }
    }
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Action for FnAction {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, job: &Job) -> Result<(), HandlerError> {
        trace!(action = %self.name, seq = job.sequence_id(), "calling fn action");
        (self.handler)(job.clone()).await
    }
}
