//! dirsync mirror client binary.
//!
//! Connects to a dirsync server, claims a username, and keeps a local
//! mirror of synchronized directories under `ClientsDir/<letter>` while
//! forwarding commands typed on stdin.
//!
//! Usage:
//!   dirsync-client amy
//!   dirsync-client --addr host:8080 --root /tmp/mirror amy

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dirsync_client::Mirror;
use dirsync_proto::SyncFrame;

/// Terminal mirror client for dirsync.
#[derive(Parser, Debug)]
#[command(name = "dirsync-client")]
#[command(about = "Mirror client for the dirsync server")]
struct Args {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Local mirror root (one subdirectory per session letter)
    #[arg(long, default_value = "ClientsDir")]
    root: PathBuf,

    /// Username to claim on the server (alphanumeric)
    username: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let stream = TcpStream::connect(&args.addr)
        .await
        .with_context(|| format!("connecting to {}", args.addr))?;
    let (read_half, mut writer) = stream.into_split();
    let mut server = BufReader::new(read_half).lines();

    // Handshake: send the desired name, receive a letter or an empty
    // rejection line.
    writer.write_all(args.username.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    let Some(letter) = server.next_line().await? else {
        bail!("server closed the connection during handshake");
    };
    let letter = letter.trim().to_string();
    if letter.is_empty() {
        bail!("username taken, please try a different username");
    }
    println!("Connected to {} as {} (slot {letter})", args.addr, args.username);

    let mut mirror = Mirror::create(&args.root, &letter)?;

    // The original client kicks off synchronization right after the
    // handshake; the server will prompt for directory names.
    writer.write_all(b"sync\n").await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = stdin.next_line() => {
                match line? {
                    None => {
                        writer.write_all(b"quit\n").await?;
                    }
                    Some(line) => {
                        writer.write_all(line.as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                    }
                }
            }
            line = server.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if let Some(frame) = SyncFrame::parse(&line) {
                    if let Err(error) = mirror.apply(&frame) {
                        tracing::warn!(%line, %error, "failed to apply sync frame");
                    }
                } else if line == "quit" {
                    println!("closing connection");
                    break;
                } else {
                    println!("{line}");
                }
            }
        }
    }

    mirror.teardown()?;
    Ok(())
}
