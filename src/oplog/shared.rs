//! Shared operation log
//!
//! Connection handlers, the reconciliation loop and locally originated
//! operations all funnel through this one lock, so the log sequence and the
//! applied-set never observe interleaved updates.

use tokio::sync::Mutex;

use super::entry::{OpId, Operation};
use super::log::{ApplyStats, OperationLog};
use crate::error::Result;
use crate::storage::LocalStore;

/// Lock-guarded operation log bound to its storage root
pub struct SharedLog {
    log: Mutex<OperationLog>,
    store: LocalStore,
}

impl SharedLog {
    pub fn new(store: LocalStore) -> Self {
        Self {
            log: Mutex::new(OperationLog::new()),
            store,
        }
    }

    /// Apply a batch under the log lock
    pub async fn apply(&self, ops: Vec<Operation>) -> Result<ApplyStats> {
        let mut log = self.log.lock().await;
        log.apply(ops, &self.store)
    }

    /// Copy of the current log
    pub async fn snapshot(&self) -> Vec<Operation> {
        self.log.lock().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.log.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.lock().await.is_empty()
    }

    pub async fn applied_count(&self) -> usize {
        self.log.lock().await.applied_count()
    }

    pub async fn contains(&self, id: &OpId) -> bool {
        self.log.lock().await.contains(id)
    }

    /// Storage the log applies into
    pub fn store(&self) -> &LocalStore {
        &self.store
    }
}
