use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use drain_model::{JobInfo, JobKind, JobOutcome, JobPage, JobQuery, JobStatus, SequenceId};

const DEFAULT_RETAIN_FINISHED: usize = 1024;

/// In-memory record of the jobs of one run.
///
/// Active jobs (pending, admitted, running) are always kept; finished ones are
/// retained up to a bound so a long-running consumer does not grow without limit.
#[derive(Clone)]
pub struct JobLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

struct LedgerInner {
    jobs: HashMap<SequenceId, JobInfo>,
    /// Terminal jobs, oldest first.
    finished: VecDeque<SequenceId>,
    retain_finished: usize,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAIN_FINISHED)
    }

    /// Keeps at most `retain_finished` terminal records.
    pub fn with_retention(retain_finished: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner {
                jobs: HashMap::new(),
                finished: VecDeque::new(),
                retain_finished,
            })),
        }
    }

    /// Records a decoded job waiting for admission.
    pub fn insert_pending(&self, sequence_id: SequenceId, kind: JobKind) {
        let mut info = JobInfo::admitted(sequence_id, kind);
        info.status = JobStatus::Pending;
        self.write().jobs.insert(sequence_id, info);
    }

    /// Moves a job forward in its lifecycle.
    ///
    /// Transitions only go forward: a late `Admitted` after the job already
    /// started running is ignored.
    pub fn advance(&self, sequence_id: SequenceId, status: JobStatus) {
        let mut inner = self.write();
        let Some(info) = inner.jobs.get_mut(&sequence_id) else {
            return;
        };
        if rank(status) <= rank(info.status) || info.status.is_terminal() {
            return;
        }
        info.status = status;
        info.updated_at = SystemTime::now();
        if status.is_terminal() {
            inner.retire(sequence_id);
        }
    }

    /// Records the outcome of a finished action.
    pub fn complete(&self, sequence_id: SequenceId, outcome: JobOutcome, error: Option<String>) {
        let mut inner = self.write();
        let Some(info) = inner.jobs.get_mut(&sequence_id) else {
            return;
        };
        if info.status.is_terminal() {
            return;
        }
        info.status = JobStatus::Completed;
        info.outcome = Some(outcome);
        info.updated_at = SystemTime::now();
        if let Some(err) = error {
            info.error = Some(err);
        }
        inner.retire(sequence_id);
    }

    /// Records a job that was never started.
    pub fn reject(&self, sequence_id: SequenceId, kind: JobKind, reason: impl Into<String>) {
        let mut info = JobInfo::admitted(sequence_id, kind);
        info.status = JobStatus::Rejected;
        info.error = Some(reason.into());

        let mut inner = self.write();
        inner.jobs.insert(sequence_id, info);
        inner.retire(sequence_id);
    }

    pub fn get(&self, sequence_id: SequenceId) -> Option<JobInfo> {
        self.read().jobs.get(&sequence_id).cloned()
    }

    /// Jobs not yet in a terminal state, in sequence order.
    pub fn active(&self) -> Vec<JobInfo> {
        let inner = self.read();
        let mut items: Vec<JobInfo> = inner
            .jobs
            .values()
            .filter(|info| info.status.is_active())
            .cloned()
            .collect();
        items.sort_by_key(|info| info.sequence_id);
        items
    }

    pub fn count_by_status(&self, status: JobStatus) -> usize {
        self.read()
            .jobs
            .values()
            .filter(|info| info.status == status)
            .count()
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().jobs.is_empty()
    }

    /// Filters by kind and status, then paginates in sequence order.
    ///
    /// `total` reflects the count after filtering, before pagination.
    pub fn query(&self, q: &JobQuery) -> JobPage<JobInfo> {
        let inner = self.read();

        let mut filtered: Vec<&JobInfo> = inner
            .jobs
            .values()
            .filter(|info| q.kind.as_ref().is_none_or(|kind| &info.kind == kind))
            .filter(|info| q.status.is_none_or(|status| info.status == status))
            .collect();
        filtered.sort_by_key(|info| info.sequence_id);
        let total = filtered.len();

        let items = filtered
            .into_iter()
            .skip(q.offset)
            .take(q.limit)
            .cloned()
            .collect();

        JobPage { items, total }
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for JobLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerInner {
    fn retire(&mut self, sequence_id: SequenceId) {
        self.finished.push_back(sequence_id);
        while self.finished.len() > self.retain_finished {
            if let Some(oldest) = self.finished.pop_front() {
                self.jobs.remove(&oldest);
            }
        }
    }
}

fn rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Pending => 0,
        JobStatus::Admitted => 1,
        JobStatus::Running => 2,
        JobStatus::Completed | JobStatus::Rejected => 3,
    }
}
