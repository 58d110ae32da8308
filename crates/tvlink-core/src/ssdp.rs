//! SSDP search messages and probe-reply parsing.
//!
//! The multicast discovery strategy sends M-SEARCH requests to the well-known
//! SSDP group and parses whatever answers.  This module holds the protocol
//! constants, the search-message builders, and the pure parsing path from a
//! raw reply to a [`DiscoveredTv`] candidate.  The socket handling lives in
//! the proxy crate's infrastructure layer.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::classify::{classify, DeviceKind};
use crate::device::{DiscoveredTv, MANUFACTURER, SPECIFIC_NAME_PREFIX};

/// The SSDP multicast group address.
pub const SSDP_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// The SSDP multicast port.
pub const SSDP_PORT: u16 = 1900;

/// Search targets probed during discovery, most specific first.
///
/// Three distinct targets improve delivery odds on lossy segments and cover
/// TVs that only answer one of them: the webOS second-screen service, the
/// generic DIAL service, and the catch-all `ssdp:all`.
pub const SEARCH_TARGETS: &[&str] = &[
    "urn:lge-com:service:webos-second-screen:1",
    "urn:dial-multiscreen-org:service:dial:1",
    "ssdp:all",
];

/// Builds an M-SEARCH request for the given search target.
pub fn search_message(search_target: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_ADDR}:{SSDP_PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: 3\r\n\
         ST: {search_target}\r\n\r\n"
    )
}

/// A raw reply received on the multicast socket.
#[derive(Debug, Clone)]
pub struct ProbeReply {
    /// The reply body as text.
    pub body: String,
    /// IPv4 address the reply came from.
    pub source: Ipv4Addr,
}

impl ProbeReply {
    pub fn new(body: impl Into<String>, source: Ipv4Addr) -> Self {
        Self { body: body.into(), source }
    }
}

/// Splits a reply body into a header map with lowercase keys.
///
/// Lines without a colon (the status line, blank lines) are skipped; values
/// are trimmed.  A later duplicate header overwrites an earlier one, which is
/// fine for the informational headers read here.
pub fn parse_headers(body: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in body.split("\r\n") {
        if let Some(idx) = line.find(':') {
            if idx == 0 {
                continue;
            }
            let key = line[..idx].trim().to_lowercase();
            let value = line[idx + 1..].trim().to_string();
            headers.insert(key, value);
        }
    }
    headers
}

/// Extracts the `uuid:` component from a USN-style header value.
///
/// `uuid:ab1234-cd56::urn:...` → `ab1234-cd56`.
pub fn extract_uuid(usn: &str) -> Option<String> {
    let rest = usn.split("uuid:").nth(1)?;
    let uuid: String = rest.chars().take_while(|c| *c != ':').collect();
    if uuid.is_empty() {
        None
    } else {
        Some(uuid)
    }
}

/// Parses a probe reply into a device candidate.
///
/// Returns `None` when the reply does not classify as a TV candidate.  A
/// reply that classifies as a webOS device gets the specific display name;
/// other candidates keep their advertised name, which keeps them eligible for
/// a later specific upgrade under the merge rule.
pub fn parse_probe_reply(reply: &ProbeReply, control_port: u16) -> Option<DiscoveredTv> {
    let kind = classify(&reply.body)?;
    let headers = parse_headers(&reply.body);

    let uuid = headers.get("usn").and_then(|usn| extract_uuid(usn));

    // Prefer the most descriptive header the device offered.
    let advertised = headers
        .get("server")
        .or_else(|| headers.get("user-agent"))
        .or_else(|| headers.get("st"))
        .cloned()
        .unwrap_or_else(|| "TV Device".to_string());

    let name = match kind {
        DeviceKind::WebOsTv => format!("{SPECIFIC_NAME_PREFIX}{}", reply.source),
        DeviceKind::DialDevice | DeviceKind::SmartTv => advertised.clone(),
    };

    Some(DiscoveredTv {
        id: reply.source.to_string(),
        name: name.clone(),
        ip_address: reply.source,
        port: control_port,
        model: None,
        manufacturer: Some(MANUFACTURER.to_string()),
        friendly_name: Some(name),
        uuid,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
