//! Mirror Node
//!
//! Owns one replica: the storage root, the operation log, the replication
//! server, and the reconciliation loop. Exposes the public operations that
//! callers (CLI, shell) use to mutate the tree.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::MirrorConfig;
use crate::error::{Error, Result};
use crate::network::{PeerAddr, PeerClient, ReplicationServer};
use crate::oplog::{Operation, SharedLog};
use crate::replication::{BroadcastReport, Broadcaster, Reconciler};
use crate::storage::{LocalStore, TreeEntry};

/// A running replication peer
pub struct Node {
    id: String,
    peers: Vec<PeerAddr>,
    log: Arc<SharedLog>,
    server: Arc<ReplicationServer>,
    broadcaster: Broadcaster,
    reconciler: Arc<Reconciler>,
    shutdown: watch::Sender<bool>,
}

impl Node {
    /// Bring a node up: open the root, bind the server, run the initial
    /// reconciliation pass, then start the periodic loop.
    pub async fn start(config: MirrorConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let peers = config.peer_addrs()?;
        let store = LocalStore::open(config.root())?;
        let log = Arc::new(SharedLog::new(store));

        let server = Arc::new(
            ReplicationServer::bind(
                &config.node.bind_address,
                Arc::clone(&log),
                config.network.max_message_bytes,
            )
            .await?,
        );

        let client = PeerClient::new(config.peer_timeout());
        let broadcaster = Broadcaster::new(peers.clone(), client.clone());
        let reconciler = Arc::new(Reconciler::new(
            config.node.id.clone(),
            peers.clone(),
            client,
            Arc::clone(&log),
            config.cluster.merge_strategy,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let node = Arc::new(Self {
            id: config.node.id.clone(),
            peers,
            log,
            server,
            broadcaster,
            reconciler,
            shutdown: shutdown_tx,
        });

        let server = Arc::clone(&node.server);
        let node_id = node.id.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start().await {
                tracing::error!("[{}] replication server error: {}", node_id, e);
            }
        });

        info!(
            "[{}] listening on {} | peers: {}",
            node.id,
            node.local_addr()?,
            node.peers.len()
        );

        // The listener is bound before this pass, so peers can already reach us
        if let Err(e) = node.reconciler.reconcile_once().await {
            tracing::error!("[{}] initial sync failed: {}", node.id, e);
        }

        tokio::spawn(Arc::clone(&node.reconciler).run(config.sync_interval(), shutdown_rx));

        Ok(node)
    }

    /// Node identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address the replication server is bound to
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.server.local_addr()
    }

    /// Local storage root
    pub fn root(&self) -> &Path {
        self.log.store().root()
    }

    /// Create a directory (and missing ancestors) everywhere
    pub async fn create_directory(&self, path: &str) -> Result<Operation> {
        self.originate(Operation::mkdir(path)).await
    }

    /// Write a UTF-8 text file everywhere. Paths ending in a separator are
    /// rejected.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<Operation> {
        if path.ends_with('/') {
            return Err(Error::InvalidInput(format!(
                "'{}' ends in '/' and looks like a directory; name a file",
                path
            )));
        }
        self.originate(Operation::write(path, content)).await
    }

    /// Copy a local file from outside the replicated root into it
    pub async fn transfer_local_file(&self, source: &Path, dest_path: &str) -> Result<Operation> {
        if !source.is_file() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }
        let bytes = tokio::fs::read(source).await?;
        self.originate(Operation::transfer(dest_path, bytes)).await
    }

    /// Delete a file or directory everywhere
    pub async fn delete(&self, path: &str) -> Result<Operation> {
        self.originate(Operation::delete(path)).await
    }

    /// Local tree for display. Not replicated.
    pub fn list_tree(&self) -> Result<Vec<TreeEntry>> {
        self.log.store().list_tree()
    }

    /// Configured peer addresses
    pub fn list_peers(&self) -> &[PeerAddr] {
        &self.peers
    }

    /// Copy of the local operation log
    pub async fn log_snapshot(&self) -> Vec<Operation> {
        self.log.snapshot().await
    }

    /// Number of operations applied on this node
    pub async fn applied_count(&self) -> usize {
        self.log.applied_count().await
    }

    /// Trigger a reconciliation pass outside the schedule
    pub async fn sync_now(&self) -> Result<bool> {
        Ok(self.reconciler.reconcile_once().await?.is_some())
    }

    /// Stop the server and the reconciliation loop
    pub fn shutdown(&self) {
        self.server.stop();
        let _ = self.shutdown.send(true);
        info!("[{}] shutting down", self.id);
    }

    /// Apply locally, then push to peers. The local apply is complete before
    /// any peer is contacted; peer failures never reach the caller.
    async fn originate(&self, op: Operation) -> Result<Operation> {
        // Reject bad paths before anything is logged
        self.log.store().resolve(&op.path)?;

        self.log.apply(vec![op.clone()]).await?;
        info!("[{}] {} {}", self.id, op.cmd, op.path);

        let report = self.broadcast(&op).await;
        debug!(
            "[{}] broadcast {}: {} delivered, {} skipped",
            self.id,
            op.id,
            report.delivered.len(),
            report.skipped.len()
        );

        Ok(op)
    }

    async fn broadcast(&self, op: &Operation) -> BroadcastReport {
        self.broadcaster.broadcast(std::slice::from_ref(op)).await
    }
}
