use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::cache::{FingerprintCache, Lease, LeaseSet};
use crate::fingerprint::ClientHello;
use crate::listener::Listener;
use crate::record::{read_record, RecordError};
use crate::rewind::RewindStream;

#[derive(Debug, Clone)]
pub struct InterceptorConfig {
    /// Upper bound on waiting for the ClientHello. `None` leaves timing
    /// entirely to the transport.
    pub hello_timeout: Option<Duration>,
    /// Log each decoded ClientHello from a detached task.
    pub log_client_hello: bool,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            hello_timeout: None,
            log_client_hello: true,
        }
    }
}

/// Wraps a [`Listener`], fingerprints the first TLS record of every accepted
/// connection and hands the connection back with that record rewound.
///
/// Interception is fail-open: a stream that is not TLS, ends early, errors,
/// times out or carries an undecodable ClientHello is still delivered, byte
/// for byte, and only misses its cache entry. The only error `accept` returns
/// is the wrapped listener's own.
///
/// Dropping the interceptor (or calling [`close`](Self::close)) closes the
/// listener and releases the cache entries of connections it delivered that
/// are still open.
pub struct Interceptor<L> {
    listener: L,
    cache: Arc<FingerprintCache>,
    config: InterceptorConfig,
    leases: Arc<LeaseSet>,
}

impl<L: Listener> Interceptor<L> {
    pub fn new(listener: L, cache: Arc<FingerprintCache>) -> Self {
        Self::with_config(listener, cache, InterceptorConfig::default())
    }

    pub fn with_config(listener: L, cache: Arc<FingerprintCache>, config: InterceptorConfig) -> Self {
        Self {
            listener,
            cache,
            config,
            leases: Arc::new(LeaseSet::default()),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn cache(&self) -> &Arc<FingerprintCache> {
        &self.cache
    }

    pub async fn accept(&self) -> io::Result<RewindStream<L::Stream>> {
        let (mut stream, peer) = self.listener.accept().await?;
        let local = self.listener.stream_local_addr(&stream).ok();
        let addr = peer.to_string();
        debug!(peer = %addr, "reading ClientHello");

        let mut record = Vec::with_capacity(512);
        let lease = match self.read_hello(&mut stream, &mut record).await {
            Ok(()) => self.remember(&addr, &record),
            Err(RecordError::NotTls(first)) => {
                debug!(peer = %addr, first_byte = first, "not a TLS handshake, passing through");
                None
            }
            Err(e) => {
                debug!(peer = %addr, buffered = record.len(), error = %e, "no complete ClientHello");
                None
            }
        };

        let mut conn = RewindStream::new(stream, record, peer).with_lease(lease);
        if let Some(local) = local {
            conn = conn.with_local_addr(local);
        }
        Ok(conn)
    }

    /// Close the listener and release every entry its connections still hold.
    pub fn close(self) {
        drop(self);
    }

    async fn read_hello(&self, stream: &mut L::Stream, record: &mut Vec<u8>) -> Result<(), RecordError> {
        match self.config.hello_timeout {
            Some(limit) => tokio::time::timeout(limit, read_record(stream, record))
                .await
                .unwrap_or(Err(RecordError::TimedOut(limit))),
            None => read_record(stream, record).await,
        }
    }

    fn remember(&self, addr: &str, record: &[u8]) -> Option<Lease> {
        match self.cache.lease(addr, record, &self.leases) {
            Ok((hello, lease)) => {
                debug!(peer = %addr, "cached fingerprint");
                if self.config.log_client_hello {
                    spawn_hello_log(addr.to_string(), hello);
                }
                Some(lease)
            }
            Err(e) => {
                error!(peer = %addr, error = %e, "failed to fingerprint ClientHello");
                None
            }
        }
    }
}

impl<L> Drop for Interceptor<L> {
    fn drop(&mut self) {
        let released = self.leases.release_all(&self.cache);
        debug!(released, "interceptor closed");
    }
}

/// Fire-and-forget: nothing waits on it and it may outlive the connection.
fn spawn_hello_log(addr: String, hello: ClientHello) {
    tokio::spawn(async move {
        info!(peer = %addr, client_hello = %hello, "parsed ClientHello");
    });
}
