//! Broadcast of locally originated operations

use tracing::{debug, warn};

use crate::network::{PeerAddr, PeerClient};
use crate::oplog::Operation;

/// Outcome of one broadcast call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers that acknowledged the push
    pub delivered: Vec<PeerAddr>,
    /// Peers that were unreachable or failed the exchange
    pub skipped: Vec<PeerAddr>,
}

/// Pushes operations to every configured peer, once, skipping failures
#[derive(Debug, Clone)]
pub struct Broadcaster {
    peers: Vec<PeerAddr>,
    client: PeerClient,
}

impl Broadcaster {
    pub fn new(peers: Vec<PeerAddr>, client: PeerClient) -> Self {
        Self { peers, client }
    }

    /// Push `ops` to each peer in turn.
    ///
    /// Never fails: a peer that cannot be reached is skipped and only
    /// catches up through reconciliation.
    pub async fn broadcast(&self, ops: &[Operation]) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for peer in &self.peers {
            match self.client.push(peer, ops.to_vec()).await {
                Ok(()) => {
                    debug!("Pushed {} operations to {}", ops.len(), peer);
                    report.delivered.push(peer.clone());
                }
                Err(e) => {
                    warn!("Skipping peer {} for broadcast: {}", peer, e);
                    report.skipped.push(peer.clone());
                }
            }
        }

        report
    }
}
