//! Network Client
//!
//! Short-lived outbound connections: connect, send one request, read one
//! response, close. The timeout bounds the connect and every individual
//! read or write, so a dead peer is skipped quickly while a live one can
//! stream a large log for as long as it keeps sending.

use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{read_message_idle, write_message_idle, PeerAddr, Request, Response};
use crate::error::{Error, Result};
use crate::oplog::Operation;

/// One-shot request/response client
#[derive(Debug, Clone)]
pub struct PeerClient {
    /// Bound on connect and on each read or write step
    timeout: Duration,
}

impl PeerClient {
    /// Create a new peer client
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Send a request to a peer and wait for its response
    pub async fn request(&self, peer: &PeerAddr, request: &Request) -> Result<Response> {
        match self.exchange(peer, request).await {
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::TimedOut => {
                Err(Error::ConnectionTimeout(peer.to_string()))
            }
            other => other,
        }
    }

    /// Push operations to a peer and wait for the acknowledgement
    pub async fn push(&self, peer: &PeerAddr, ops: Vec<Operation>) -> Result<()> {
        match self.request(peer, &Request::Ops { log: ops }).await? {
            Response::Ok => Ok(()),
            other => Err(Error::UnexpectedResponse(format!(
                "{} answered push with {}",
                peer,
                other.type_name()
            ))),
        }
    }

    /// Pull a peer's full log
    pub async fn pull(&self, peer: &PeerAddr) -> Result<Vec<Operation>> {
        match self.request(peer, &Request::Sync).await? {
            Response::Log { log } => Ok(log),
            other => Err(Error::UnexpectedResponse(format!(
                "{} answered sync with {}",
                peer,
                other.type_name()
            ))),
        }
    }

    async fn exchange(&self, peer: &PeerAddr, request: &Request) -> Result<Response> {
        let mut stream = self.connect(peer).await?;

        let (mut reader, mut writer) = stream.split();
        tracing::trace!("Sending {} to {}", request.type_name(), peer);
        write_message_idle(&mut writer, request, self.timeout).await?;

        read_message_idle(&mut reader, self.timeout)
            .await?
            .ok_or_else(|| Error::UnexpectedResponse(format!("{} closed without responding", peer)))
    }

    /// Connect to a peer
    async fn connect(&self, peer: &PeerAddr) -> Result<TcpStream> {
        let result = timeout(self.timeout, TcpStream::connect((peer.host.as_str(), peer.port))).await;

        match result {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                Ok(stream)
            }
            Ok(Err(e)) => Err(Error::ConnectionFailed {
                address: peer.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(Error::ConnectionTimeout(peer.to_string())),
        }
    }
}
