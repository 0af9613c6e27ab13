use std::net::SocketAddr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid output format '{}'. Expected 'text' or 'json'.", s),
        }
    }
}

/// What the proxy knows about one accepted connection.
pub struct ConnectionReport<'a> {
    pub peer: SocketAddr,
    pub local: Option<SocketAddr>,
    pub algorithm: &'a str,
    pub fingerprint: Option<&'a str>,
    /// Size of the intercepted leading record (or prefix, for non-TLS streams).
    pub hello_bytes: usize,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    peer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    local: Option<String>,
    algorithm: &'a str,
    fingerprint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hello_bytes: Option<usize>,
}

pub fn print_report(report: &ConnectionReport<'_>, format: OutputFormat, verbose: bool) {
    match format {
        OutputFormat::Text => print!("{}", render_text(report, verbose)),
        OutputFormat::Json => println!("{}", render_json(report, verbose)),
    }
}

fn render_text(report: &ConnectionReport<'_>, verbose: bool) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out.push_str(&format!("  Client:     {}\n", report.peer));
    if let Some(local) = report.local {
        out.push_str(&format!("  Local:      {}\n", local));
    }
    out.push_str(&format!(
        "  {:<11} {}\n",
        format!("{}:", report.algorithm.to_uppercase()),
        report.fingerprint.unwrap_or("(no ClientHello)")
    ));
    if verbose {
        out.push_str(&format!("  Hello:      {} bytes\n", report.hello_bytes));
    }
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out
}

fn render_json(report: &ConnectionReport<'_>, verbose: bool) -> String {
    let record = JsonRecord {
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        peer: report.peer.to_string(),
        local: report.local.map(|a| a.to_string()),
        algorithm: report.algorithm,
        fingerprint: report.fingerprint,
        hello_bytes: verbose.then_some(report.hello_bytes),
    };
    // Serializing plain strings and integers cannot fail.
    serde_json::to_string(&record).unwrap_or_default()
}
