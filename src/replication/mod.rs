//! Replication Module
//!
//! Outbound replication between mirror nodes: best-effort push of newly
//! originated operations, and periodic pull-and-merge of peer logs.

mod broadcast;
mod reconcile;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use reconcile::{merge_union, select_longest, ReconcileOutcome, Reconciler};

use serde::{Deserialize, Serialize};

/// How logs collected from peers are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Apply only the longest collected log (first collected wins ties).
    /// Assumes a longer log has seen a superset of history; no causality check.
    #[default]
    Longest,
    /// Apply every collected log in collection order, deduplicated by id
    Union,
}
