use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use drain_model::{Job, JobKind};
use tracing::{debug, instrument, trace};

use crate::error::HandlerError;

/// Executable unit of work selected by a job's kind.
///
/// Implementations must keep failures local: an error or panic inside `run`
/// is recorded against the job and never reaches the consumer loop.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, job: &Job) -> Result<(), HandlerError>;
}

/// Fallback that completes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAction;

#[async_trait]
impl Action for NoopAction {
    fn name(&self) -> &str {
        "noop"
    }

    async fn run(&self, job: &Job) -> Result<(), HandlerError> {
        trace!(seq = job.sequence_id(), kind = %job.kind(), "noop action");
        Ok(())
    }
}

/// Lookup table from job kind to action.
///
/// Unknown kinds never fail: they are routed to the fallback action.
pub struct HandlerRegistry {
    actions: HashMap<JobKind, Arc<dyn Action>>,
    fallback: Arc<dyn Action>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(Arc::new(NoopAction))
    }
}

impl HandlerRegistry {
    #[inline]
    pub fn new(fallback: Arc<dyn Action>) -> Self {
        Self {
            actions: HashMap::new(),
            fallback,
        }
    }

    /// Registers `action` for `kind`, returning the action it replaced.
    pub fn register(
        &mut self,
        kind: impl Into<JobKind>,
        action: Arc<dyn Action>,
    ) -> Option<Arc<dyn Action>> {
        let kind = kind.into();
        debug!(%kind, action = action.name(), "action registered");
        self.actions.insert(kind, action)
    }

    #[inline]
    pub fn with(mut self, kind: impl Into<JobKind>, action: Arc<dyn Action>) -> Self {
        self.register(kind, action);
        self
    }

    #[inline]
    pub fn set_fallback(&mut self, action: Arc<dyn Action>) {
        self.fallback = action;
    }

    pub fn unregister(&mut self, kind: &str) -> bool {
        self.actions.remove(kind).is_some()
    }

    #[inline]
    pub fn contains(&self, kind: &str) -> bool {
        self.actions.contains_key(kind)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&JobKind> {
        let mut kinds: Vec<_> = self.actions.keys().collect();
        kinds.sort();
        kinds
    }

    pub fn fallback(&self) -> &Arc<dyn Action> {
        &self.fallback
    }

    /// Action registered for `kind`, if any; no fallback.
    pub fn pick(&self, kind: &str) -> Option<&Arc<dyn Action>> {
        self.actions.get(kind)
    }

    /// Action that will run `job`.
    #[instrument(level = "trace", skip(self, job), fields(kind = %job.kind()))]
    pub fn dispatch(&self, job: &Job) -> Arc<dyn Action> {
        match self.pick(job.kind().as_str()) {
            Some(action) => {
                trace!(action = action.name(), "kind matched");
                Arc::clone(action)
            }
            None => {
                trace!(action = self.fallback.name(), "no match; using fallback");
                Arc::clone(&self.fallback)
            }
        }
    }
}
