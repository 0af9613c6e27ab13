//! ClientHello decoding and the fingerprint algorithms the cache can run.

pub mod clienthello;
pub mod grease;
pub mod ja3;
pub mod ja4;
pub mod types;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use clienthello::{decode_client_hello, DecodeError};
pub use types::{ClientHello, Fingerprint};

/// Turns raw handshake records into fingerprint strings.
///
/// Implementations must be deterministic: the same ClientHello always
/// yields the same string.
pub trait FingerprintEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, raw: &[u8]) -> Result<ClientHello, DecodeError> {
        decode_client_hello(raw)
    }

    fn fingerprint(&self, hello: &ClientHello) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ja3Engine;

impl FingerprintEngine for Ja3Engine {
    fn name(&self) -> &'static str {
        "ja3"
    }

    fn fingerprint(&self, hello: &ClientHello) -> String {
        ja3::ja3(hello).hash
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ja4Engine;

impl FingerprintEngine for Ja4Engine {
    fn name(&self) -> &'static str {
        "ja4"
    }

    fn fingerprint(&self, hello: &ClientHello) -> String {
        ja4::ja4(hello).hash
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FingerprintKind {
    #[default]
    Ja3,
    Ja4,
}

impl FingerprintKind {
    pub fn engine(self) -> Arc<dyn FingerprintEngine> {
        match self {
            Self::Ja3 => Arc::new(Ja3Engine),
            Self::Ja4 => Arc::new(Ja4Engine),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown fingerprint algorithm '{0}', expected 'ja3' or 'ja4'")]
pub struct ParseKindError(String);

impl FromStr for FingerprintKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ja3" => Ok(Self::Ja3),
            "ja4" => Ok(Self::Ja4),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ja3 => "ja3",
            Self::Ja4 => "ja4",
        })
    }
}
