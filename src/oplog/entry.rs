//! Operation Types
//!
//! Defines the replicated unit of work: one filesystem mutation with a
//! globally unique identifier assigned by the originating node.

use serde::{Deserialize, Serialize};

/// Globally unique operation identifier.
///
/// Assigned once at the originating node and never regenerated when the
/// operation is relayed or replayed; this is the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OpId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OpId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filesystem mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Create a directory and its missing ancestors
    Mkdir,
    /// Create or overwrite a file with UTF-8 text
    Write,
    /// Remove a file or a whole directory
    Delete,
    /// Create or overwrite a file with raw bytes read from a local source
    Transfer,
}

impl Command {
    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Mkdir => "mkdir",
            Command::Write => "write",
            Command::Delete => "delete",
            Command::Transfer => "transfer",
        }
    }

    /// Whether operations of this kind carry content
    pub fn has_content(&self) -> bool {
        matches!(self, Command::Write | Command::Transfer)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single replicated operation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OpId,
    pub cmd: Command,
    /// Slash-rooted logical path, relative to each node's storage root
    pub path: String,
    /// File content, present only for `write` and `transfer`
    pub content: Option<Vec<u8>>,
}

impl Operation {
    /// Create an operation with a freshly generated id
    pub fn new(cmd: Command, path: impl Into<String>, content: Option<Vec<u8>>) -> Self {
        let content = if cmd.has_content() {
            Some(content.unwrap_or_default())
        } else {
            None
        };

        Self {
            id: OpId::generate(),
            cmd,
            path: path.into(),
            content,
        }
    }

    pub fn mkdir(path: impl Into<String>) -> Self {
        Self::new(Command::Mkdir, path, None)
    }

    pub fn write(path: impl Into<String>, text: &str) -> Self {
        Self::new(Command::Write, path, Some(text.as_bytes().to_vec()))
    }

    pub fn transfer(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(Command::Transfer, path, Some(bytes))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Command::Delete, path, None)
    }

    /// Content bytes, empty when absent
    pub fn content(&self) -> &[u8] {
        self.content.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.id, self.cmd, self.path)?;
        if self.cmd.has_content() {
            write!(f, " ({} bytes)", self.content().len())?;
        }
        Ok(())
    }
}
