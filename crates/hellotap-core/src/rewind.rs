use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::cache::Lease;

/// A connection whose already-consumed leading bytes are replayed to the
/// next reader before anything new is read from the underlying stream.
///
/// Writes, flushes and shutdown go straight through. Dropping the stream
/// closes the underlying connection and releases its fingerprint entry.
#[derive(Debug)]
pub struct RewindStream<S> {
    inner: S,
    replay: Vec<u8>,
    offset: usize,
    peer: SocketAddr,
    local: Option<SocketAddr>,
    lease: Option<Lease>,
}

impl<S> RewindStream<S> {
    pub fn new(inner: S, replay: Vec<u8>, peer: SocketAddr) -> Self {
        Self {
            inner,
            replay,
            offset: 0,
            peer,
            local: None,
            lease: None,
        }
    }

    /// Record the local end of the connection for [`local_addr`](Self::local_addr).
    pub fn with_local_addr(mut self, local: SocketAddr) -> Self {
        self.local = Some(local);
        self
    }

    pub(crate) fn with_lease(mut self, lease: Option<Lease>) -> Self {
        self.lease = lease;
        self
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.local
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "local address unknown"))
    }

    /// Current cache entry for this connection's client address, if any.
    pub fn fingerprint(&self) -> Option<String> {
        self.lease.as_ref().and_then(Lease::fingerprint)
    }

    /// Bytes still waiting to be replayed.
    pub fn buffered(&self) -> &[u8] {
        &self.replay[self.offset..]
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for RewindStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.offset < self.replay.len() {
            let start = self.offset;
            let end = start + (self.replay.len() - start).min(buf.remaining());
            buf.put_slice(&self.replay[start..end]);
            self.offset = end;
            if self.offset == self.replay.len() {
                self.replay = Vec::new();
                self.offset = 0;
            }
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for RewindStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
