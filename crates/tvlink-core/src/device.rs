//! The discovered-device type and its display-name policy.
//!
//! A [`DiscoveredTv`] is transient: it is created during one discovery call
//! and never persisted.  The IP address is the sole identity — any discovery
//! result contains at most one entry per IP, enforced by the caller's result
//! set using [`prefer_incoming`] to resolve collisions.
//!
//! # Specific vs. generic names
//!
//! Two kinds of display name exist:
//!
//! - **Specific**: `LG TV at <ip>` — produced when a multicast reply
//!   positively identified a webOS/LG device, or when a user-supplied address
//!   answered a direct probe.
//! - **Generic**: anything else — a sweep hit (`TV device at <ip>`) or an
//!   unrecognised-but-classified multicast reply's advertised name.
//!
//! When both strategies report the same IP, the specific name wins regardless
//! of which strategy reported first.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Display-name prefix that marks an entry as positively identified.
pub const SPECIFIC_NAME_PREFIX: &str = "LG TV at ";

/// Manufacturer string attached to devices answering on the control port.
pub const MANUFACTURER: &str = "LG Electronics";

/// A smart-TV candidate found on the local network.
///
/// Serializes with camelCase field names so the JSON matches the discovery
/// result shape clients expect:
///
/// ```json
/// {"id":"10.0.0.5","name":"LG TV at 10.0.0.5","ipAddress":"10.0.0.5","port":3001}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredTv {
    /// Unique identifier — the IP address string.  The IP is the sole dedup
    /// key for discovery results.
    pub id: String,
    /// Display name shown to the user (specific or generic, see module docs).
    pub name: String,
    /// IPv4 address of the device.
    pub ip_address: Ipv4Addr,
    /// Control port the device listens on.
    pub port: u16,
    /// Model string, when a probe reply advertised one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Manufacturer, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Friendly name from the probe reply headers, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// UPnP instance identifier extracted from a USN-style header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl DiscoveredTv {
    /// Builds a positively identified entry with the specific display name.
    pub fn specific(ip: Ipv4Addr, port: u16) -> Self {
        let name = format!("{SPECIFIC_NAME_PREFIX}{ip}");
        Self {
            id: ip.to_string(),
            name: name.clone(),
            ip_address: ip,
            port,
            model: None,
            manufacturer: Some(MANUFACTURER.to_string()),
            friendly_name: Some(name),
            uuid: None,
        }
    }

    /// Builds a sweep-derived entry with a generic display name.
    ///
    /// A bare successful connect proves only that something answers on the
    /// control port, so the name stays generic until a probe reply upgrades it.
    pub fn generic(ip: Ipv4Addr, port: u16) -> Self {
        Self {
            id: ip.to_string(),
            name: format!("TV device at {ip}"),
            ip_address: ip,
            port,
            model: None,
            manufacturer: Some(MANUFACTURER.to_string()),
            friendly_name: None,
            uuid: None,
        }
    }

    /// Returns `true` if this entry carries the specific display name.
    pub fn has_specific_name(&self) -> bool {
        is_specific_name(&self.name)
    }
}

/// Returns `true` for display names matching the specific naming pattern.
pub fn is_specific_name(name: &str) -> bool {
    name.starts_with(SPECIFIC_NAME_PREFIX)
}

/// The merge-preference predicate for same-IP collisions.
///
/// Returns `true` iff `incoming` should replace `existing`: only when the
/// incoming entry has a specific name and the existing one does not.  In
/// every other case the existing entry is kept, so the outcome is independent
/// of strategy arrival order and an already-specific entry is never churned.
pub fn prefer_incoming(existing: &DiscoveredTv, incoming: &DiscoveredTv) -> bool {
    incoming.has_specific_name() && !existing.has_specific_name()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
