//! The Local-Address Catalog.
//!
//! Enumerates the host's own non-loopback IPv4 addresses once at startup.
//! Discovery uses the catalog two ways: the first address determines the /24
//! swept by the active strategy, and every address is excluded from results
//! so the host never lists itself as a TV.

use std::net::{IpAddr, Ipv4Addr};

use tracing::{debug, warn};

/// The host's non-loopback IPv4 addresses, in interface enumeration order.
#[derive(Debug, Clone)]
pub struct LocalAddrCatalog {
    addrs: Vec<Ipv4Addr>,
}

impl LocalAddrCatalog {
    /// Enumerates the host's interfaces.
    ///
    /// Enumeration failure is absorbed: discovery still works with an empty
    /// catalog, minus the sweep strategy (which needs a subnet to scan).
    pub fn detect() -> Self {
        let mut addrs = Vec::new();
        match local_ip_address::list_afinet_netifas() {
            Ok(interfaces) => {
                for (name, ip) in interfaces {
                    match ip {
                        IpAddr::V4(v4) if !v4.is_loopback() => {
                            debug!("local address {v4} on {name}");
                            addrs.push(v4);
                        }
                        IpAddr::V4(_) => {}
                        IpAddr::V6(_) => {
                            // IPv6 is out of scope for the /24 sweep.
                        }
                    }
                }
            }
            Err(e) => warn!("failed to enumerate network interfaces: {e}"),
        }
        if addrs.is_empty() {
            warn!("no non-loopback IPv4 interface found; sweep will be skipped");
        }
        Self { addrs }
    }

    /// Builds a catalog from known addresses (tests, overrides).
    pub fn from_addrs(addrs: Vec<Ipv4Addr>) -> Self {
        Self { addrs }
    }

    /// All catalogued addresses.
    pub fn addrs(&self) -> &[Ipv4Addr] {
        &self.addrs
    }

    /// Returns `true` if `ip` is one of the host's own addresses.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.addrs.contains(&ip)
    }

    /// First three octets of the primary interface, the base of the /24 to
    /// sweep.  `None` when the catalog is empty.
    pub fn subnet_base(&self) -> Option<[u8; 3]> {
        let octets = self.addrs.first()?.octets();
        Some([octets[0], octets[1], octets[2]])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
