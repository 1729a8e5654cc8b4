//! Reconciliation
//!
//! Pulls the full log from every reachable peer and merges what was
//! collected into the local log. Runs once at startup and then on a fixed
//! interval. Because apply is deduplicated by operation id, replaying a
//! log the node has mostly seen only executes the genuinely new entries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::MergeStrategy;
use crate::error::Result;
use crate::network::{PeerAddr, PeerClient};
use crate::oplog::{ApplyStats, Operation, SharedLog};

/// Result of a reconciliation pass in which at least one peer answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Number of peers that returned a log
    pub peers_answered: usize,
    /// Number of operations handed to apply after merging
    pub merged_len: usize,
    pub stats: ApplyStats,
}

/// Index of the longest log; the earliest collected wins ties
pub fn select_longest(logs: &[Vec<Operation>]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, log) in logs.iter().enumerate() {
        match best {
            Some(b) if logs[b].len() >= log.len() => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Concatenate logs in collection order, keeping the first occurrence of
/// every operation id
pub fn merge_union(logs: Vec<Vec<Operation>>) -> Vec<Operation> {
    let mut seen = HashSet::new();
    logs.into_iter()
        .flatten()
        .filter(|op| seen.insert(op.id.clone()))
        .collect()
}

/// Periodic pull-and-merge against the configured peers
pub struct Reconciler {
    node_id: String,
    peers: Vec<PeerAddr>,
    client: PeerClient,
    log: Arc<SharedLog>,
    strategy: MergeStrategy,
}

impl Reconciler {
    pub fn new(
        node_id: String,
        peers: Vec<PeerAddr>,
        client: PeerClient,
        log: Arc<SharedLog>,
        strategy: MergeStrategy,
    ) -> Self {
        Self {
            node_id,
            peers,
            client,
            log,
            strategy,
        }
    }

    /// Pull the log from each peer in turn, skipping any that fail
    pub async fn collect_logs(&self) -> Vec<(PeerAddr, Vec<Operation>)> {
        let mut collected = Vec::new();

        for peer in &self.peers {
            match self.client.pull(peer).await {
                Ok(log) => {
                    debug!("[{}] received log from {} ({} ops)", self.node_id, peer, log.len());
                    collected.push((peer.clone(), log));
                }
                Err(e) => {
                    debug!("[{}] skipping peer {} for sync: {}", self.node_id, peer, e);
                }
            }
        }

        collected
    }

    /// Run one reconciliation pass.
    ///
    /// Returns `Ok(None)` if no peer answered. A storage failure while
    /// applying the merged log is returned; operations applied before it
    /// stay applied.
    pub async fn reconcile_once(&self) -> Result<Option<ReconcileOutcome>> {
        let collected = self.collect_logs().await;
        if collected.is_empty() {
            warn!("[{}] no reachable peers to sync with", self.node_id);
            return Ok(None);
        }

        let peers_answered = collected.len();
        let logs: Vec<Vec<Operation>> = collected.into_iter().map(|(_, log)| log).collect();

        let merged = match self.strategy {
            MergeStrategy::Longest => {
                let mut logs = logs;
                match select_longest(&logs) {
                    Some(i) => logs.swap_remove(i),
                    None => Vec::new(),
                }
            }
            MergeStrategy::Union => merge_union(logs),
        };

        let merged_len = merged.len();
        let stats = self.log.apply(merged).await?;

        if stats.applied > 0 {
            info!(
                "[{}] synced {} new operations ({} already applied)",
                self.node_id, stats.applied, stats.skipped
            );
        } else {
            debug!("[{}] already in sync ({} ops compared)", self.node_id, merged_len);
        }

        Ok(Some(ReconcileOutcome {
            peers_answered,
            merged_len,
            stats,
        }))
    }

    /// Repeat `reconcile_once` every `period` until shutdown is signalled.
    ///
    /// The first pass runs one full period after the call; the startup pass
    /// is the caller's job.
    pub async fn run(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile_once().await {
                        error!("[{}] reconciliation failed: {}", self.node_id, e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("[{}] reconciliation loop stopped", self.node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::net::TcpListener;

    use crate::network::{read_message, write_message, Request, Response};
    use crate::oplog::OpId;
    use crate::storage::LocalStore;

    /// Peer that answers every sync with a fixed log
    async fn canned_peer(log: Vec<Operation>) -> PeerAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let log = log.clone();
                tokio::spawn(async move {
                    if let Ok(Some(Request::Sync)) = read_message::<Request, _>(&mut socket).await {
                        let _ = write_message(&mut socket, &Response::Log { log }).await;
                    }
                });
            }
        });

        PeerAddr::new("127.0.0.1", port)
    }

    fn mkdirs(prefix: &str, n: usize) -> Vec<Operation> {
        (0..n).map(|i| Operation::mkdir(format!("/{}{}", prefix, i))).collect()
    }

    fn reconciler(root: &std::path::Path, peers: Vec<PeerAddr>, strategy: MergeStrategy) -> (Reconciler, Arc<SharedLog>) {
        let log = Arc::new(SharedLog::new(LocalStore::open(root).unwrap()));
        let reconciler = Reconciler::new(
            "test".to_string(),
            peers,
            PeerClient::new(Duration::from_millis(500)),
            Arc::clone(&log),
            strategy,
        );
        (reconciler, log)
    }

    #[test]
    fn test_select_longest_prefers_first_on_ties() {
        let logs = vec![mkdirs("a", 2), mkdirs("b", 5), mkdirs("c", 5), mkdirs("d", 3)];
        assert_eq!(select_longest(&logs), Some(1));
        assert_eq!(select_longest(&[]), None);
        assert_eq!(select_longest(&[vec![], vec![]]), Some(0));
    }

    #[test]
    fn test_merge_union_dedups_by_id() {
        let shared = Operation::mkdir("/shared");
        let a = vec![shared.clone(), Operation::mkdir("/a")];
        let b = vec![Operation::mkdir("/b"), shared.clone()];

        let merged = merge_union(vec![a.clone(), b.clone()]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id, shared.id);
        assert_eq!(merged[2].id, b[0].id);
    }

    #[tokio::test]
    async fn test_reconcile_applies_longest_log() {
        let long = mkdirs("long", 5);
        let peers = vec![
            canned_peer(mkdirs("short", 2)).await,
            canned_peer(long.clone()).await,
            canned_peer(mkdirs("mid", 3)).await,
        ];

        let dir = tempdir().unwrap();
        let (reconciler, log) = reconciler(dir.path(), peers, MergeStrategy::Longest);

        // Already have one of the long log's operations
        log.apply(vec![long[2].clone()]).await.unwrap();

        let outcome = reconciler.reconcile_once().await.unwrap().unwrap();
        assert_eq!(outcome.peers_answered, 3);
        assert_eq!(outcome.merged_len, 5);
        assert_eq!(outcome.stats, ApplyStats { applied: 4, skipped: 1 });

        let distinct: HashSet<&OpId> = long.iter().map(|op| &op.id).collect();
        assert_eq!(log.applied_count().await, distinct.len());
        assert!(dir.path().join("long4").is_dir());
        assert!(!dir.path().join("short0").exists());
        assert!(!dir.path().join("mid0").exists());
    }

    #[tokio::test]
    async fn test_reconcile_union_strategy() {
        let peers = vec![
            canned_peer(mkdirs("x", 2)).await,
            canned_peer(mkdirs("y", 2)).await,
        ];

        let dir = tempdir().unwrap();
        let (reconciler, log) = reconciler(dir.path(), peers, MergeStrategy::Union);

        let outcome = reconciler.reconcile_once().await.unwrap().unwrap();
        assert_eq!(outcome.stats.applied, 4);
        assert_eq!(log.len().await, 4);
    }

    #[tokio::test]
    async fn test_reconcile_without_reachable_peers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dir = tempdir().unwrap();
        let (reconciler, log) = reconciler(
            dir.path(),
            vec![PeerAddr::new("127.0.0.1", port)],
            MergeStrategy::Longest,
        );

        assert!(reconciler.reconcile_once().await.unwrap().is_none());
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let dir = tempdir().unwrap();
        let peer = canned_peer(mkdirs("tick", 1)).await;
        let (reconciler, log) = reconciler(dir.path(), vec![peer], MergeStrategy::Longest);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::new(reconciler).run(Duration::from_millis(50), rx));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(log.len().await, 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
