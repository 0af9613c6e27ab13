use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use hellotap_core::{FingerprintCache, FingerprintKind, Interceptor, InterceptorConfig};

mod output;
mod relay;

use output::{ConnectionReport, OutputFormat};

#[derive(Parser)]
#[command(name = "hellotap-proxy")]
#[command(about = "Fingerprints TLS clients from their ClientHello, then relays the untouched stream to a backend")]
struct Cli {
    /// Address to accept client connections on
    #[arg(short, long, default_value = "0.0.0.0:8443")]
    listen: SocketAddr,

    /// TLS server to forward every connection to (host:port)
    #[arg(short, long)]
    backend: String,

    /// Fingerprint algorithm: "ja3" or "ja4"
    #[arg(short, long, default_value_t = FingerprintKind::Ja3)]
    algorithm: FingerprintKind,

    /// Give up waiting for a ClientHello after this many milliseconds.
    /// The connection is still forwarded. 0 waits forever, which lets one
    /// silent client hold up every later accept.
    #[arg(long, default_value_t = 5_000)]
    hello_timeout_ms: u64,

    /// Backend connect timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    connect_timeout_ms: u64,

    /// Output format: "text" (human-readable) or "json" (NDJSON, one object per line)
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Include the intercepted record size in the output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Do not log decoded ClientHello summaries
    #[arg(long, default_value_t = false)]
    no_log_hello: bool,
}

fn hello_timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let format = OutputFormat::parse(&cli.output)?;
    let connect_timeout = Duration::from_millis(cli.connect_timeout_ms);
    let backend: Arc<str> = Arc::from(cli.backend.as_str());

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    let cache = Arc::new(FingerprintCache::with_kind(cli.algorithm));
    let config = InterceptorConfig {
        hello_timeout: hello_timeout(cli.hello_timeout_ms),
        log_client_hello: !cli.no_log_hello,
    };
    let interceptor = Interceptor::with_config(listener, Arc::clone(&cache), config);

    info!("hellotap listening on {}, forwarding to {}", cli.listen, backend);
    info!("Fingerprint algorithm: {}", cli.algorithm);
    info!("Press Ctrl+C to stop\n");

    loop {
        let mut conn = tokio::select! {
            accepted = interceptor.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        let fingerprint = conn.fingerprint();
        output::print_report(
            &ConnectionReport {
                peer: conn.peer_addr(),
                local: conn.local_addr().ok(),
                algorithm: cache.engine().name(),
                fingerprint: fingerprint.as_deref(),
                hello_bytes: conn.buffered().len(),
            },
            format,
            cli.verbose,
        );

        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            let peer = conn.peer_addr();
            match relay::relay(&mut conn, &backend, connect_timeout).await {
                Ok((up, down)) => debug!(%peer, up, down, "connection closed"),
                Err(e) => warn!(%peer, "relay failed: {:#}", e),
            }
            // Dropping `conn` here releases its fingerprint.
        });
    }

    info!("Shutting down, {} fingerprints cached", cache.len());
    interceptor.close();
    Ok(())
}
