//! WolfMirror Configuration
//!
//! Configuration structures for a mirror node: identity, listen address,
//! storage root and the static peer list.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::network::PeerAddr;
use crate::replication::MergeStrategy;

/// Main WolfMirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Node-specific configuration
    pub node: NodeConfig,

    /// Cluster configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Network limits
    #[serde(default)]
    pub network: NetworkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node identifier
    pub id: String,

    /// Address to bind for replication traffic
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Root of the replicated directory tree
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Static list of peer addresses (host:port)
    #[serde(default)]
    pub peers: Vec<String>,

    /// Interval between reconciliation passes in milliseconds
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Bound on connecting to a peer and on each read or write, in milliseconds
    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,

    /// How collected peer logs are merged during reconciliation
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Largest inbound request frame the server will accept
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:9600".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("fsroot")
}

fn default_sync_interval_ms() -> u64 {
    5000
}

fn default_peer_timeout_ms() -> u64 {
    500
}

fn default_max_message_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            sync_interval_ms: default_sync_interval_ms(),
            peer_timeout_ms: default_peer_timeout_ms(),
            merge_strategy: MergeStrategy::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl MirrorConfig {
    /// Build a configuration from the startup parameters alone
    pub fn new(id: impl Into<String>, bind_address: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            node: NodeConfig {
                id: id.into(),
                bind_address: bind_address.into(),
                root: root.into(),
            },
            cluster: ClusterConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: MirrorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.id.is_empty() {
            return Err(crate::Error::Config("node.id cannot be empty".into()));
        }

        if self.node.bind_address.is_empty() {
            return Err(crate::Error::Config("node.bind_address cannot be empty".into()));
        }

        if self.node.root.as_os_str().is_empty() {
            return Err(crate::Error::Config("node.root cannot be empty".into()));
        }

        if self.cluster.sync_interval_ms == 0 {
            return Err(crate::Error::Config("cluster.sync_interval_ms must be positive".into()));
        }

        if self.cluster.peer_timeout_ms == 0 {
            return Err(crate::Error::Config("cluster.peer_timeout_ms must be positive".into()));
        }

        self.peer_addrs()?;
        Ok(())
    }

    /// Parse the configured peer list
    pub fn peer_addrs(&self) -> crate::Result<Vec<PeerAddr>> {
        self.cluster.peers.iter().map(|p| p.parse()).collect()
    }

    /// Get the storage root
    pub fn root(&self) -> &PathBuf {
        &self.node.root
    }

    /// Get reconciliation interval as Duration
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.cluster.sync_interval_ms)
    }

    /// Get per-peer timeout as Duration
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster.peer_timeout_ms)
    }
}
