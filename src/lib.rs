//! WolfMirror - Peer-Replicated Directory Store
//!
//! Every node keeps a local copy of a file tree and propagates mutations
//! (create directory, write or transfer a file, delete) to a fixed set of
//! peers, so that all reachable nodes eventually hold the same tree.
//!
//! # Architecture
//!
//! Each mutation becomes an [`Operation`](oplog::Operation) with a unique id.
//! A node applies it to its own root first, appends it to its operation log,
//! then pushes it to every peer once. Peers that missed the push catch up
//! through periodic reconciliation: the node pulls every reachable peer's
//! full log and replays the longest one. Apply is keyed by operation id, so
//! replays only execute what is new.
//!
//! Convergence is eventual and best-effort. There is no causal ordering,
//! leader, or conflict resolution beyond the id-deduplicated replay.

pub mod config;
pub mod error;
pub mod network;
pub mod node;
pub mod oplog;
pub mod replication;
pub mod shell;
pub mod storage;

pub use config::MirrorConfig;
pub use error::{Error, Result};
pub use node::Node;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MirrorConfig;
    pub use crate::error::{Error, Result};
    pub use crate::network::{PeerAddr, PeerClient, ReplicationServer};
    pub use crate::node::Node;
    pub use crate::oplog::{Command, OpId, Operation, OperationLog, SharedLog};
    pub use crate::replication::{Broadcaster, MergeStrategy, Reconciler};
    pub use crate::storage::{LocalStore, TreeEntry};
}
