use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

/// Source of inbound connections that an [`Interceptor`](crate::Interceptor) wraps.
#[async_trait]
pub trait Listener: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wait for the next connection and its remote address.
    async fn accept(&self) -> io::Result<(Self::Stream, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Local address `stream` was accepted on. Listeners whose streams carry
    /// no address of their own report the listening address.
    fn stream_local_addr(&self, _stream: &Self::Stream) -> io::Result<SocketAddr> {
        self.local_addr()
    }
}

#[async_trait]
impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }

    fn stream_local_addr(&self, stream: &TcpStream) -> io::Result<SocketAddr> {
        stream.local_addr()
    }
}
