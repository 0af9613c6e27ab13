use std::fmt;

/// The parts of a TLS ClientHello that fingerprinting reads.
///
/// Every list keeps wire order; GREASE values are kept here and only
/// dropped by the individual fingerprint algorithms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHello {
    /// `legacy_version` from the handshake body (0x0303 for TLS 1.2 and 1.3)
    pub version: u16,
    pub cipher_suites: Vec<u16>,
    /// Extension type codes
    pub extensions: Vec<u16>,
    /// Named groups from `supported_groups` (0x000a)
    pub supported_groups: Vec<u16>,
    /// From `ec_point_formats` (0x000b)
    pub ec_point_formats: Vec<u8>,
    /// From `signature_algorithms` (0x000d)
    pub signature_algorithms: Vec<u16>,
    pub server_name: Option<String>,
    pub alpn_protocols: Vec<String>,
    /// From `supported_versions` (0x002b)
    pub supported_versions: Vec<u16>,
}

impl fmt::Display for ClientHello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version=0x{:04x} sni={} ciphers={} extensions={} groups={:?} formats={:?}",
            self.version,
            self.server_name.as_deref().unwrap_or("-"),
            self.cipher_suites.len(),
            self.extensions.len(),
            self.supported_groups,
            self.ec_point_formats,
        )?;
        if !self.alpn_protocols.is_empty() {
            write!(f, " alpn={}", self.alpn_protocols.join(","))?;
        }
        if !self.supported_versions.is_empty() {
            let versions: Vec<String> = self
                .supported_versions
                .iter()
                .map(|v| format!("0x{:04x}", v))
                .collect();
            write!(f, " versions={}", versions.join(","))?;
        }
        Ok(())
    }
}

/// A computed fingerprint together with the canonical string it was hashed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: String,
    pub raw: String,
}
