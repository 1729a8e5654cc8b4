//! Replication Protocol
//!
//! One request and one response per connection. Anything that does not
//! decode into a `Request` is dropped by the server.

use serde::{Deserialize, Serialize};

use crate::oplog::Operation;

/// Requests accepted by the replication server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    /// Push operations for the receiver to apply
    Ops { log: Vec<Operation> },
    /// Ask for a copy of the receiver's full log
    Sync,
}

/// Responses sent by the replication server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Pushed operations were applied
    Ok,
    /// Full log snapshot
    Log { log: Vec<Operation> },
}

impl Request {
    /// Get the request type name (for logging)
    pub fn type_name(&self) -> &'static str {
        match self {
            Request::Ops { .. } => "ops",
            Request::Sync => "sync",
        }
    }
}

impl Response {
    /// Get the response type name (for logging)
    pub fn type_name(&self) -> &'static str {
        match self {
            Response::Ok => "ok",
            Response::Log { .. } => "log",
        }
    }
}
