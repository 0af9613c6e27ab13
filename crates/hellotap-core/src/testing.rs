//! Builders for well-formed ClientHello records used across the unit tests.

pub(crate) struct HelloSpec {
    pub ciphers: Vec<u16>,
    pub sni: Option<&'static str>,
    pub groups: Vec<u16>,
    pub alpn: Vec<&'static str>,
    /// Prepend an empty GREASE (0x2a2a) extension.
    pub grease_extension: bool,
}

impl Default for HelloSpec {
    fn default() -> Self {
        Self {
            ciphers: vec![0x1301, 0x1302, 0x1303],
            sni: Some("example.com"),
            groups: vec![0x001d, 0x0017],
            alpn: vec!["h2"],
            grease_extension: false,
        }
    }
}

impl HelloSpec {
    /// Full TLS record: 5-byte header, handshake header, ClientHello body.
    pub fn record(&self) -> Vec<u8> {
        let mut extensions = Vec::new();
        if self.grease_extension {
            extensions.extend(extension(0x2a2a, &[]));
        }
        if let Some(name) = self.sni {
            let mut entry = vec![0x00];
            entry.extend(with_u16_len(name.as_bytes()));
            extensions.extend(extension(0x0000, &with_u16_len(&entry)));
        }
        extensions.extend(extension(0x000a, &u16_list(&self.groups)));
        extensions.extend(extension(0x000b, &[0x01, 0x00]));
        extensions.extend(extension(0x000d, &u16_list(&[0x0403, 0x0804])));
        let mut protocols = Vec::new();
        for proto in &self.alpn {
            protocols.push(proto.len() as u8);
            protocols.extend_from_slice(proto.as_bytes());
        }
        extensions.extend(extension(0x0010, &with_u16_len(&protocols)));
        extensions.extend(extension(0x002b, &[0x04, 0x03, 0x04, 0x03, 0x03]));

        let mut body = vec![0x03, 0x03];
        body.extend_from_slice(&[0x5a; 32]);
        body.push(0x00); // empty session id
        body.extend(u16_list(&self.ciphers));
        body.extend_from_slice(&[0x01, 0x00]); // null compression only
        body.extend(with_u16_len(&extensions));

        let mut handshake = vec![0x01];
        handshake.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        handshake.extend(body);

        let mut record = vec![0x16, 0x03, 0x01];
        record.extend(with_u16_len(&handshake));
        record
    }
}

fn extension(id: u16, data: &[u8]) -> Vec<u8> {
    let mut out = id.to_be_bytes().to_vec();
    out.extend(with_u16_len(data));
    out
}

fn u16_list(values: &[u16]) -> Vec<u8> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    with_u16_len(&bytes)
}

fn with_u16_len(data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(data);
    out
}
