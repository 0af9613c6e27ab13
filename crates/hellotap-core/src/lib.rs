//! Transparent TLS ClientHello interception.
//!
//! An [`Interceptor`] wraps a listener, reads the first TLS record of each
//! accepted connection, stores its fingerprint in a shared
//! [`FingerprintCache`] under the client's address and returns the
//! connection as a [`RewindStream`] that replays the consumed bytes, so the
//! TLS stack behind it sees the stream untouched.

pub mod cache;
pub mod fingerprint;
pub mod interceptor;
pub mod listener;
pub mod record;
pub mod rewind;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{FingerprintCache, Lease};
pub use fingerprint::{ClientHello, DecodeError, FingerprintEngine, FingerprintKind};
pub use interceptor::{Interceptor, InterceptorConfig};
pub use listener::Listener;
pub use record::{read_record, RecordError};
pub use rewind::RewindStream;
