use std::fmt::Display;

use md5::{Digest, Md5};

use crate::fingerprint::grease::without_grease;
use crate::fingerprint::types::{ClientHello, Fingerprint};

/// JA3: `MD5("version,ciphers,extensions,groups,formats")`.
///
/// Values are decimal and dash-joined within a field; GREASE code points
/// are dropped from every u16 field. The hash is lowercase hex.
pub fn ja3(hello: &ClientHello) -> Fingerprint {
    let raw = ja3_string(hello);
    let hash = format!("{:x}", Md5::digest(raw.as_bytes()));
    Fingerprint { hash, raw }
}

pub fn ja3_string(hello: &ClientHello) -> String {
    format!(
        "{},{},{},{},{}",
        hello.version,
        dash_join(without_grease(&hello.cipher_suites)),
        dash_join(without_grease(&hello.extensions)),
        dash_join(without_grease(&hello.supported_groups)),
        dash_join(hello.ec_point_formats.iter()),
    )
}

fn dash_join<I>(values: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
