use tls_parser::nom::{Err as NomErr, Needed};
use tls_parser::{
    parse_tls_extensions, parse_tls_plaintext, TlsClientHelloContents, TlsExtension,
    TlsExtensionType, TlsMessage, TlsMessageHandshake,
};

use crate::fingerprint::types::ClientHello;
use crate::record::{CONTENT_TYPE_HANDSHAKE, RECORD_HEADER_LEN};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("record too short: {0} bytes")]
    TooShort(usize),
    #[error("not a handshake record (content type 0x{0:02x})")]
    NotHandshake(u8),
    #[error("record truncated: have {have} bytes, need {need}")]
    Truncated { have: usize, need: usize },
    #[error("handshake record carries no ClientHello")]
    NotClientHello,
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("malformed extensions block: {0}")]
    Extensions(String),
}

/// Decode one TLS plaintext record, header included, into a [`ClientHello`].
///
/// Fails instead of panicking on any framing or length inconsistency.
pub fn decode_client_hello(raw: &[u8]) -> Result<ClientHello, DecodeError> {
    if raw.len() < RECORD_HEADER_LEN {
        return Err(DecodeError::TooShort(raw.len()));
    }
    if raw[0] != CONTENT_TYPE_HANDSHAKE {
        return Err(DecodeError::NotHandshake(raw[0]));
    }

    let (_, record) = parse_tls_plaintext(raw).map_err(|e| match e {
        NomErr::Incomplete(Needed::Size(n)) => DecodeError::Truncated {
            have: raw.len(),
            need: raw.len() + n.get(),
        },
        NomErr::Incomplete(Needed::Unknown) => DecodeError::Truncated {
            have: raw.len(),
            need: raw.len() + 1,
        },
        other => DecodeError::Malformed(other.to_string()),
    })?;

    record
        .msg
        .iter()
        .find_map(|msg| match msg {
            TlsMessage::Handshake(TlsMessageHandshake::ClientHello(ch)) => Some(ch),
            _ => None,
        })
        .ok_or(DecodeError::NotClientHello)
        .and_then(from_contents)
}

fn from_contents(ch: &TlsClientHelloContents) -> Result<ClientHello, DecodeError> {
    let mut hello = ClientHello {
        version: ch.version.0,
        cipher_suites: ch.ciphers.iter().map(|c| c.0).collect(),
        ..Default::default()
    };

    let Some(block) = ch.ext else {
        return Ok(hello);
    };
    let (_, extensions) =
        parse_tls_extensions(block).map_err(|e| DecodeError::Extensions(e.to_string()))?;

    for ext in &extensions {
        hello.extensions.push(extension_id(ext));
        apply_extension(&mut hello, ext);
    }
    Ok(hello)
}

/// Wire type code of `ext`. tls-parser folds every GREASE extension into
/// 0xfafa, so the original code point is taken from the variant itself.
fn extension_id(ext: &TlsExtension) -> u16 {
    match ext {
        TlsExtension::Grease(id, _) => *id,
        other => TlsExtensionType::from(other).0,
    }
}

fn apply_extension(hello: &mut ClientHello, ext: &TlsExtension) {
    match ext {
        TlsExtension::SNI(names) => {
            hello.server_name = names
                .iter()
                .find_map(|(_, name)| std::str::from_utf8(name).ok())
                .map(str::to_owned);
        }
        TlsExtension::EllipticCurves(groups) => {
            hello.supported_groups = groups.iter().map(|g| g.0).collect();
        }
        TlsExtension::EcPointFormats(formats) => {
            hello.ec_point_formats = formats.to_vec();
        }
        TlsExtension::SignatureAlgorithms(algs) => {
            hello.signature_algorithms = algs.to_vec();
        }
        TlsExtension::ALPN(protocols) => {
            hello.alpn_protocols = protocols
                .iter()
                .filter_map(|p| std::str::from_utf8(p).ok())
                .map(str::to_owned)
                .collect();
        }
        TlsExtension::SupportedVersions(versions) => {
            hello.supported_versions = versions.iter().map(|v| v.0).collect();
        }
        _ => {}
    }
}
