//! Concrete job actions for the drain consumer.
//!
//! - [`DelayAction`]: simulated work that logs the job and sleeps.
//! - [`FnAction`]: wraps an async closure.
//! - [`ProcAction`] (feature `proc`): runs a program with the job on stdin.
//!
//! [`register_builtin_actions`] wires the demonstration kinds (`email`,
//! `file_process`, `fast_task`, `medium_task`, `slow_task`) and the fallback.

mod error;
pub use error::{ExecError, ExecResult};

mod delay;
pub use delay::DelayAction;

pub mod r#fn;
pub use r#fn::FnAction;

#[cfg(feature = "proc")]
pub mod proc;
#[cfg(feature = "proc")]
pub use proc::{ProcAction, ProcConfig};

#[cfg(feature = "proc")]
pub mod utils;

mod builtin;
pub use builtin::{BUILTIN_KINDS, FALLBACK_DELAY, builtin_registry, register_builtin_actions};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{DelayAction, FnAction, builtin_registry, register_builtin_actions};

    #[cfg(feature = "proc")]
    pub use crate::{ProcAction, ProcConfig};
}
