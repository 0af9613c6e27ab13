//! Reads the first TLS record off a live stream.
//!
//! Every byte taken from the stream is appended to a caller-owned buffer the
//! moment it is read, whatever the outcome, so the caller can always replay
//! exactly what was consumed. This also holds when the read future is dropped
//! part way through (for example by an outer timeout).

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// content_type(1) + version(2) + length(2)
pub const RECORD_HEADER_LEN: usize = 5;
pub const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("not a TLS handshake record (first byte 0x{0:02x})")]
    NotTls(u8),
    #[error("stream ended after {got} of {need} bytes")]
    ShortRead { got: usize, need: usize },
    #[error("I/O error while reading ClientHello: {0}")]
    Io(#[from] io::Error),
    #[error("no complete ClientHello within {0:?}")]
    TimedOut(Duration),
}

/// Read one TLS handshake record (header plus declared body) into `buf`.
///
/// The content type is checked as soon as the first byte arrives, so a
/// stream that is not TLS costs exactly one byte. Never reads past the
/// declared record length and imposes no timeout of its own.
pub async fn read_record<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<(), RecordError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let base = buf.len();

    fill(reader, buf, base, 1).await?;
    let content_type = buf[base];
    if content_type != CONTENT_TYPE_HANDSHAKE {
        return Err(RecordError::NotTls(content_type));
    }

    fill(reader, buf, base, RECORD_HEADER_LEN).await?;
    let body_len = u16::from_be_bytes([buf[base + 3], buf[base + 4]]) as usize;

    fill(reader, buf, base, RECORD_HEADER_LEN + body_len).await
}

/// Grow `buf` until it holds `need` bytes past `base`, one bounded read at a time.
async fn fill<R>(reader: &mut R, buf: &mut Vec<u8>, base: usize, need: usize) -> Result<(), RecordError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    while buf.len() - base < need {
        let missing = need - (buf.len() - base);
        let n = (&mut *reader).take(missing as u64).read_buf(buf).await?;
        if n == 0 {
            return Err(RecordError::ShortRead {
                got: buf.len() - base,
                need,
            });
        }
    }
    Ok(())
}
