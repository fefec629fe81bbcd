//! dirsync server binary.
//!
//! Serves a shared directory store over a line-oriented TCP protocol:
//! each connected user gets a sandboxed home, a causal command log with
//! cascading undo, and live directory synchronization to its client.
//!
//! Usage:
//!   dirsync-server
//!   dirsync-server --port 9090 --root /srv/dirsync

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dirsync_server::constants::{DEFAULT_PORT, DEFAULT_ROOT};
use dirsync_server::{ServerConfig, serve};

/// Multi-user sandboxed directory server.
#[derive(Parser, Debug)]
#[command(name = "dirsync-server")]
#[command(about = "Sandboxed directory server with causal undo and live sync")]
struct Args {
    /// TCP port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Store root directory (one subdirectory per user)
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    serve(ServerConfig {
        port: args.port,
        root: args.root,
    })
    .await
}
