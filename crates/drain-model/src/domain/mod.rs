mod job_kind;
pub use job_kind::JobKind;

mod job;
pub use job::{Job, Payload};

mod job_status;
pub use job_status::{JobOutcome, JobStatus};

mod job_info;
pub use job_info::JobInfo;

mod job_query;
pub use job_query::{JobPage, JobQuery};

/// Monotonic per-run identifier stamped on every popped payload.
///
/// Used for log correlation only; it says nothing about queue order.
pub type SequenceId = u64;
