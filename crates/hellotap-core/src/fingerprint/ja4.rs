use sha2::{Digest, Sha256};

use crate::fingerprint::grease::without_grease;
use crate::fingerprint::types::{ClientHello, Fingerprint};

const EXT_SERVER_NAME: u16 = 0x0000;
const EXT_ALPN: u16 = 0x0010;
const EMPTY_HASH: &str = "000000000000";

/// JA4 for a TCP ClientHello: `{a}_{b}_{c}`.
///
/// - a: `t`, version, `d`/`i` for SNI, cipher count, extension count, ALPN edge chars
/// - b: sorted cipher suites, SHA-256 truncated to 12 hex chars
/// - c: sorted extensions without SNI and ALPN, then signature algorithms
///   in wire order, SHA-256 truncated to 12 hex chars
///
/// `raw` carries the same layout with the pre-hash strings in place of b and c.
pub fn ja4(hello: &ClientHello) -> Fingerprint {
    let a = prefix(hello);
    let b = cipher_list(hello);
    let c = extension_list(hello);

    Fingerprint {
        hash: format!("{}_{}_{}", a, short_hash(&b), short_hash(&c)),
        raw: format!("{}_{}_{}", a, b, c),
    }
}

fn prefix(hello: &ClientHello) -> String {
    let sni = if hello.server_name.is_some() { 'd' } else { 'i' };
    let ciphers = without_grease(&hello.cipher_suites).len().min(99);
    let extensions = without_grease(&hello.extensions).len().min(99);
    format!(
        "t{}{}{:02}{:02}{}",
        version_label(hello),
        sni,
        ciphers,
        extensions,
        alpn_label(&hello.alpn_protocols)
    )
}

fn cipher_list(hello: &ClientHello) -> String {
    let mut ciphers = without_grease(&hello.cipher_suites);
    ciphers.sort_unstable();
    hex_list(&ciphers)
}

fn extension_list(hello: &ClientHello) -> String {
    let mut extensions: Vec<u16> = without_grease(&hello.extensions)
        .into_iter()
        .filter(|e| *e != EXT_SERVER_NAME && *e != EXT_ALPN)
        .collect();
    extensions.sort_unstable();

    let extensions = hex_list(&extensions);
    if hello.signature_algorithms.is_empty() {
        extensions
    } else {
        format!("{}_{}", extensions, hex_list(&hello.signature_algorithms))
    }
}

/// Highest non-GREASE `supported_versions` entry, else the hello's own version.
fn version_label(hello: &ClientHello) -> &'static str {
    let version = without_grease(&hello.supported_versions)
        .into_iter()
        .max()
        .unwrap_or(hello.version);
    match version {
        0x0304 => "13",
        0x0303 => "12",
        0x0302 => "11",
        0x0301 => "10",
        0x0300 => "s3",
        0x0200 => "s2",
        _ => "00",
    }
}

fn alpn_label(protocols: &[String]) -> String {
    let Some(first) = protocols.first() else {
        return "00".to_string();
    };
    let chars: Vec<char> = first.chars().filter(char::is_ascii_alphanumeric).collect();
    match (chars.first(), chars.last()) {
        (Some(a), Some(b)) => format!("{}{}", a, b),
        _ => "00".to_string(),
    }
}

fn hex_list(values: &[u16]) -> String {
    values
        .iter()
        .map(|v| format!("{:04x}", v))
        .collect::<Vec<_>>()
        .join(",")
}

fn short_hash(input: &str) -> String {
    if input.is_empty() {
        return EMPTY_HASH.to_string();
    }
    let mut digest = hex::encode(Sha256::digest(input.as_bytes()));
    digest.truncate(12);
    digest
}
