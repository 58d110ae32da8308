//! Probe-reply classification rules.
//!
//! A multicast probe collects replies from everything on the segment that
//! speaks UPnP — printers, routers, media renderers.  Only a small fixed
//! vocabulary marks a reply as a TV candidate.  The rules live in a single
//! declarative table so the classification logic can be inspected and tested
//! without touching any parsing code.
//!
//! Matching is case-insensitive substring search over the whole reply body;
//! the first matching rule wins, so more distinctive markers are listed
//! before catch-alls like `"tv"`.

/// The kind of device a probe reply appears to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// An LG webOS TV (vendor or protocol-family marker present).
    WebOsTv,
    /// A device advertising the DIAL second-screen service.
    DialDevice,
    /// Some other device that self-describes as a TV.
    SmartTv,
}

/// One classification rule: a lowercase substring marker and the kind it
/// implies.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRule {
    /// Lowercase substring to search for in the reply body.
    pub marker: &'static str,
    /// Device kind assigned when the marker is found.
    pub kind: DeviceKind,
}

/// The classification table, most distinctive markers first.
pub const CLASSIFY_RULES: &[ClassifyRule] = &[
    ClassifyRule { marker: "lge-com", kind: DeviceKind::WebOsTv },
    ClassifyRule { marker: "webos", kind: DeviceKind::WebOsTv },
    ClassifyRule { marker: "lg", kind: DeviceKind::WebOsTv },
    ClassifyRule { marker: "dial", kind: DeviceKind::DialDevice },
    ClassifyRule { marker: "smarttv", kind: DeviceKind::SmartTv },
    ClassifyRule { marker: "tv", kind: DeviceKind::SmartTv },
];

/// Classifies a raw probe-reply body.
///
/// Returns `None` when no rule matches, meaning the reply should be
/// discarded.
pub fn classify(body: &str) -> Option<DeviceKind> {
    let lower = body.to_lowercase();
    CLASSIFY_RULES
        .iter()
        .find(|rule| lower.contains(rule.marker))
        .map(|rule| rule.kind)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
