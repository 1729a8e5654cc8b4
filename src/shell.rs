//! Interactive shell commands
//!
//! Line-oriented front end over the node's public operations.

use std::path::PathBuf;

/// Help line printed by the shell
pub const HELP: &str = "Commands: transfer <src_local> <dest_path>, delete <dest_path>, list, \
mkdir <path>, write <path> <content>, log, peers, help, exit";

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Transfer { source: PathBuf, dest: String },
    Delete { path: String },
    List,
    Mkdir { path: String },
    Write { path: String, content: String },
    Log,
    Peers,
    Help,
    Exit,
}

impl ShellCommand {
    /// Parse a line. Blank lines yield `Ok(None)`; anything unrecognised is
    /// an error carrying the offending line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut parts = line.split_whitespace();
        let cmd = match parts.next() {
            Some(cmd) => cmd,
            None => return Ok(None),
        };
        let args: Vec<&str> = parts.collect();

        let parsed = match (cmd, args.as_slice()) {
            ("transfer", [src, dest]) => ShellCommand::Transfer {
                source: PathBuf::from(*src),
                dest: dest.to_string(),
            },
            ("delete", [path]) => ShellCommand::Delete { path: path.to_string() },
            ("list", []) => ShellCommand::List,
            ("mkdir", [path]) => ShellCommand::Mkdir { path: path.to_string() },
            ("write", [path, content @ ..]) if !content.is_empty() => ShellCommand::Write {
                path: path.to_string(),
                content: content.join(" "),
            },
            ("log", []) => ShellCommand::Log,
            ("peers", []) => ShellCommand::Peers,
            ("help", _) => ShellCommand::Help,
            ("exit", _) | ("quit", _) => ShellCommand::Exit,
            _ => return Err(format!("Invalid command: {}", line.trim())),
        };

        Ok(Some(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ShellCommand::parse("transfer ./local.bin /remote.bin").unwrap(),
            Some(ShellCommand::Transfer {
                source: PathBuf::from("./local.bin"),
                dest: "/remote.bin".to_string(),
            })
        );
        assert_eq!(
            ShellCommand::parse("  mkdir /a/b ").unwrap(),
            Some(ShellCommand::Mkdir { path: "/a/b".to_string() })
        );
        assert_eq!(ShellCommand::parse("list").unwrap(), Some(ShellCommand::List));
        assert_eq!(ShellCommand::parse("").unwrap(), None);
    }

    #[test]
    fn test_write_joins_content_words() {
        assert_eq!(
            ShellCommand::parse("write /notes.txt hello   there world").unwrap(),
            Some(ShellCommand::Write {
                path: "/notes.txt".to_string(),
                content: "hello there world".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert!(ShellCommand::parse("write /only-path").is_err());
        assert!(ShellCommand::parse("delete").is_err());
        assert!(ShellCommand::parse("mkdir a b").is_err());
        assert!(ShellCommand::parse("format c:").is_err());
    }
}
