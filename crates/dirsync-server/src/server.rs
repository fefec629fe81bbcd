//! TCP accept loop.
//!
//! Each accepted connection becomes an independent session task; the only
//! thing they share is the identity registry.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::registry::Registry;
use crate::session;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Store root; one subdirectory per identity.
    pub root: PathBuf,
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, root = %config.root.display(), "server started");

    let registry = Arc::new(Registry::new());
    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::info!(%peer, "accepted connection");
        let registry = Arc::clone(&registry);
        let root = config.root.clone();
        tokio::spawn(async move {
            if let Err(error) = session::run(stream, registry, &root).await {
                // Transport failures are an implicit quit, not a crash.
                tracing::warn!(%peer, %error, "session ended with transport error");
            }
        });
    }
}
