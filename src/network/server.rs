//! Replication Server
//!
//! Accepts inbound connections from peers. Each connection carries exactly
//! one request and gets at most one response. The server never initiates
//! contact.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use super::{read_message_limited, write_message, Request, Response};
use crate::error::Result;
use crate::oplog::SharedLog;

/// TCP server answering push and sync requests
pub struct ReplicationServer {
    /// Bound listener
    listener: TcpListener,
    /// Log that pushed operations are applied to
    log: Arc<SharedLog>,
    /// Largest request frame accepted
    max_message_bytes: usize,
    /// Shutdown signal
    shutdown: watch::Sender<bool>,
}

impl ReplicationServer {
    /// Bind the listen socket
    pub async fn bind(
        bind_address: &str,
        log: Arc<SharedLog>,
        max_message_bytes: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_address).await?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            listener,
            log,
            max_message_bytes,
            shutdown: shutdown_tx,
        })
    }

    /// Address the server is actually listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop until `stop` is called
    pub async fn start(&self) -> Result<()> {
        tracing::info!("Replication server listening on {}", self.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((socket, addr)) => {
                            let log = Arc::clone(&self.log);
                            let max_message_bytes = self.max_message_bytes;

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(socket, addr, log, max_message_bytes).await {
                                    tracing::warn!("Connection error from {}: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Replication server stopped");
        Ok(())
    }

    /// Stop the server
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Handle a single connection: one request, at most one response
async fn handle_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    log: Arc<SharedLog>,
    max_message_bytes: usize,
) -> Result<()> {
    let (mut reader, mut writer) = socket.into_split();

    let request: Request = match read_message_limited(&mut reader, Some(max_message_bytes)).await? {
        Some(request) => request,
        None => {
            tracing::trace!("{} closed before sending a request", peer_addr);
            return Ok(());
        }
    };

    tracing::trace!("Received {} from {}", request.type_name(), peer_addr);

    match request {
        Request::Ops { log: ops } => {
            let count = ops.len();
            let stats = log.apply(ops).await?;
            if stats.applied > 0 {
                tracing::info!(
                    "Applied {} of {} pushed operations from {}",
                    stats.applied,
                    count,
                    peer_addr
                );
            }
            write_message(&mut writer, &Response::Ok).await?;
        }
        Request::Sync => {
            let snapshot = log.snapshot().await;
            tracing::debug!("Sending {} operations to {}", snapshot.len(), peer_addr);
            write_message(&mut writer, &Response::Log { log: snapshot }).await?;
        }
    }

    Ok(())
}
