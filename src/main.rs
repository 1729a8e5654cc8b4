//! WolfMirror - Peer-Replicated Directory Store
//!
//! Starts a mirror node and drives it from the command line: one-shot
//! operations, a long-running server, or an interactive shell.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfmirror::config::MirrorConfig;
use wolfmirror::network::PeerAddr;
use wolfmirror::shell::{ShellCommand, HELP};
use wolfmirror::storage::render_tree;
use wolfmirror::Node;

/// WolfMirror - Peer-Replicated Directory Store
#[derive(Parser)]
#[command(name = "wolfmirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node identifier (overrides config)
    #[arg(long)]
    id: Option<String>,

    /// Listen port (overrides config; binds 0.0.0.0)
    #[arg(short, long)]
    port: Option<u16>,

    /// Peers as host:port,host:port (overrides config)
    #[arg(long)]
    peers: Option<String>,

    /// Storage root (overrides config)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfmirror.toml")]
        output: PathBuf,

        /// Node ID
        #[arg(long, default_value = "node-1")]
        node_id: String,
    },

    #[command(flatten)]
    Node(NodeCommand),
}

/// Commands that run against a started node
#[derive(Subcommand)]
enum NodeCommand {
    /// Run the node until interrupted
    Serve,

    /// Interactive shell (default)
    Shell,

    /// Create a directory on every node
    Mkdir { path: String },

    /// Write a text file on every node
    Write {
        path: String,
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
    },

    /// Delete a file or directory on every node
    Delete { path: String },

    /// Copy a local file into the replicated tree
    Transfer {
        /// Local source file
        src: PathBuf,
        /// Destination path inside the tree
        dest: String,
    },

    /// Show the local tree
    List,

    /// Show the local operation log
    Log {
        /// Print one JSON object per operation
        #[arg(long)]
        json: bool,
    },

    /// Show configured peers
    Peers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    match cli.command.take().unwrap_or(Commands::Node(NodeCommand::Shell)) {
        Commands::Init { output, node_id } => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            run_init(&output, &node_id)
        }
        Commands::Node(command) => run_node(&cli, command).await,
    }
}

/// Start the node, run one command against it, then shut it down
async fn run_node(cli: &Cli, command: NodeCommand) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    let node = Node::start(config).await.context("failed to start node")?;

    let result = match command {
        NodeCommand::Serve => run_serve(&node).await,
        NodeCommand::Shell => run_shell(&node).await,
        NodeCommand::Mkdir { path } => node.create_directory(&path).await.map(|_| ()).map_err(Into::into),
        NodeCommand::Write { path, content } => node
            .write_file(&path, &content.join(" "))
            .await
            .map(|_| ())
            .map_err(Into::into),
        NodeCommand::Delete { path } => node.delete(&path).await.map(|_| ()).map_err(Into::into),
        NodeCommand::Transfer { src, dest } => node
            .transfer_local_file(&src, &dest)
            .await
            .map(|_| ())
            .map_err(Into::into),
        NodeCommand::List => print_tree(&node),
        NodeCommand::Log { json } => print_log(&node, json).await,
        NodeCommand::Peers => {
            print_peers(&node);
            Ok(())
        }
    };

    node.shutdown();
    result
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the node configuration from the file (if any) and CLI overrides
fn load_config(cli: &Cli) -> anyhow::Result<MirrorConfig> {
    let mut config = match &cli.config {
        Some(path) => MirrorConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {:?}", path))?,
        None => {
            let Some(id) = &cli.id else {
                bail!("either --config or --id is required");
            };
            MirrorConfig::new(id.clone(), "0.0.0.0:9600", "fsroot")
        }
    };

    if let Some(id) = &cli.id {
        config.node.id = id.clone();
    }
    if let Some(port) = cli.port {
        config.node.bind_address = format!("0.0.0.0:{}", port);
    }
    if let Some(peers) = &cli.peers {
        config.cluster.peers = PeerAddr::parse_list(peers)?
            .iter()
            .map(ToString::to_string)
            .collect();
    }
    if let Some(root) = &cli.root {
        config.node.root = root.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Write a starter configuration file
fn run_init(output: &Path, node_id: &str) -> anyhow::Result<()> {
    if output.exists() {
        bail!("{:?} already exists", output);
    }

    let config = MirrorConfig::new(node_id, "0.0.0.0:9600", "fsroot");
    config.save(output)?;
    tracing::info!("Wrote configuration for {} to {:?}", node_id, output);
    Ok(())
}

/// Keep serving until Ctrl+C
async fn run_serve(node: &Arc<Node>) -> anyhow::Result<()> {
    tracing::info!("[{}] serving, press Ctrl+C to stop", node.id());
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");
    Ok(())
}

/// Interactive line shell over stdin
async fn run_shell(node: &Arc<Node>) -> anyhow::Result<()> {
    use std::io::Write;

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let outcome: anyhow::Result<()> = match command {
            ShellCommand::Transfer { source, dest } => node
                .transfer_local_file(&source, &dest)
                .await
                .map(|_| ())
                .map_err(Into::into),
            ShellCommand::Delete { path } => node.delete(&path).await.map(|_| ()).map_err(Into::into),
            ShellCommand::Mkdir { path } => node.create_directory(&path).await.map(|_| ()).map_err(Into::into),
            ShellCommand::Write { path, content } => {
                node.write_file(&path, &content).await.map(|_| ()).map_err(Into::into)
            }
            ShellCommand::List => print_tree(node),
            ShellCommand::Log => print_log(node, false).await,
            ShellCommand::Peers => {
                print_peers(node);
                Ok(())
            }
            ShellCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ShellCommand::Exit => break,
        };

        if let Err(e) = outcome {
            println!("Error: {}", e);
        }
    }

    Ok(())
}

fn print_tree(node: &Node) -> anyhow::Result<()> {
    let entries = node.list_tree()?;
    print!("{}", render_tree(&node.root().display().to_string(), &entries));
    Ok(())
}

async fn print_log(node: &Node, json: bool) -> anyhow::Result<()> {
    for op in node.log_snapshot().await {
        if json {
            let summary = serde_json::json!({
                "id": op.id,
                "cmd": op.cmd,
                "path": op.path,
                "size": op.content.as_ref().map(Vec::len),
            });
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!("{}", op);
        }
    }
    Ok(())
}

fn print_peers(node: &Node) {
    for (i, peer) in node.list_peers().iter().enumerate() {
        println!("Peer {}: {}", i + 1, peer);
    }
}
