//! Operation Log
//!
//! Append-only record of the operations this node has applied, plus the
//! set of applied ids used to make re-delivery a no-op.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::entry::{OpId, Operation};
use crate::error::Result;
use crate::storage::LocalStore;

/// Counts from one `apply` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Operations executed and appended
    pub applied: usize,
    /// Operations skipped because their id was already applied
    pub skipped: usize,
}

/// Per-node operation log. Order is local application order.
#[derive(Debug, Default)]
pub struct OperationLog {
    entries: Vec<Operation>,
    applied: HashSet<OpId>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch in sequence order.
    ///
    /// Operations whose id is already applied are skipped. Anything else is
    /// executed against `store`, then appended. A storage failure stops the
    /// batch; operations before it stay applied and nothing is rolled back.
    pub fn apply<I>(&mut self, ops: I, store: &LocalStore) -> Result<ApplyStats>
    where
        I: IntoIterator<Item = Operation>,
    {
        let mut stats = ApplyStats::default();

        for op in ops {
            if self.applied.contains(&op.id) {
                trace!("Skipping already applied operation {}", op.id);
                stats.skipped += 1;
                continue;
            }

            store.execute(&op)?;
            debug!("Applied {}", op);

            self.applied.insert(op.id.clone());
            self.entries.push(op);
            stats.applied += 1;
        }

        Ok(stats)
    }

    /// Check whether an operation id has been applied
    pub fn contains(&self, id: &OpId) -> bool {
        self.applied.contains(id)
    }

    /// Copy of the full log for shipping to a peer
    pub fn snapshot(&self) -> Vec<Operation> {
        self.entries.clone()
    }

    /// Number of applied operations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct applied ids
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}
