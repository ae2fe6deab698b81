use super::{JobKind, JobStatus};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Filter and pagination over ledger records.
#[derive(Debug, Clone)]
pub struct JobQuery {
    pub kind: Option<JobKind>,
    pub status: Option<JobStatus>,
    pub limit: usize,
    pub offset: usize,
}

/// One page of query results; `total` counts matches before pagination.
#[derive(Debug, Clone)]
pub struct JobPage<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl JobQuery {
    pub fn new() -> Self {
        Self {
            kind: None,
            status: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<JobKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_LIMIT);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for JobQuery {
    fn default() -> Self {
        Self::new()
    }
}
