use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{copy_bidirectional, AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Open a connection to `backend` and shuttle bytes both ways until either
/// side closes. Returns (client → backend, backend → client) byte counts.
pub async fn relay<S>(client: &mut S, backend: &str, connect_timeout: Duration) -> Result<(u64, u64)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut upstream = tokio::time::timeout(connect_timeout, TcpStream::connect(backend))
        .await
        .with_context(|| format!("Timed out connecting to backend {}", backend))?
        .with_context(|| format!("Failed to connect to backend {}", backend))?;
    upstream.set_nodelay(true).ok();
    debug!(backend, "connected to backend");

    let counts = copy_bidirectional(client, &mut upstream)
        .await
        .context("Relay interrupted")?;
    Ok(counts)
}
