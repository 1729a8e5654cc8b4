//! Operation Log Module
//!
//! Replicated operations, the per-node append-only log with its
//! idempotent apply, and the lock that serializes access to it.

pub mod entry;
mod log;
mod shared;

pub use entry::{Command, OpId, Operation};
pub use log::{ApplyStats, OperationLog};
pub use shared::SharedLog;
