//! Plain data shared by every drain crate.
//!
//! Nothing here performs I/O: jobs, their lifecycle states, ledger records and the
//! immutable configuration of a single consumer run.

mod domain;
pub use domain::*;

mod config;
pub use config::*;
