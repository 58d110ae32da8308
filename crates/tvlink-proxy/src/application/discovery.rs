//! Discovery orchestration and result merging.
//!
//! One discovery call runs the multicast probe and the active sweep
//! concurrently, joined under a hard wall-clock bound.  Both strategies
//! insert into a shared [`DeviceSink`], which enforces the two result-set
//! invariants:
//!
//! - at most one entry per IP address, collisions resolved by the explicit
//!   merge-preference rule (specific display name beats generic, independent
//!   of arrival order);
//! - no entry may carry one of the host's own addresses.
//!
//! Discovery never fails: strategy-level socket errors are absorbed inside
//! the strategies, and an expired window simply returns what was collected.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use tokio::time::timeout;
use tracing::{debug, info};

use tvlink_core::device::prefer_incoming;
use tvlink_core::DiscoveredTv;

use crate::domain::ProxyConfig;
use crate::infrastructure::local_addrs::LocalAddrCatalog;
use crate::infrastructure::{net_sweep, ssdp_probe};

// ── Result sink ───────────────────────────────────────────────────────────────

/// The deduplicating result set shared by both strategies of one call.
///
/// Insertion is safe under concurrent use; conflicts are resolved by
/// [`prefer_incoming`], never by arrival order.
pub struct DeviceSink {
    /// Host addresses that must never appear in results.
    local: Vec<Ipv4Addr>,
    /// Collected candidates keyed by IP.
    devices: Mutex<HashMap<Ipv4Addr, DiscoveredTv>>,
}

impl DeviceSink {
    /// Creates an empty sink excluding the given host addresses.
    pub fn new(local: Vec<Ipv4Addr>) -> Self {
        Self {
            local,
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Offers a candidate to the result set.
    ///
    /// Returns `true` if the candidate was stored (inserted or replaced an
    /// existing entry under the preference rule).
    pub fn offer(&self, tv: DiscoveredTv) -> bool {
        if self.local.contains(&tv.ip_address) {
            debug!("skipping own address {}", tv.ip_address);
            return false;
        }

        let mut devices = self.devices.lock().expect("device sink poisoned");
        match devices.get(&tv.ip_address) {
            None => {
                debug!("found {} at {}", tv.name, tv.ip_address);
                devices.insert(tv.ip_address, tv);
                true
            }
            Some(existing) if prefer_incoming(existing, &tv) => {
                debug!("upgrading entry for {} to {}", tv.ip_address, tv.name);
                devices.insert(tv.ip_address, tv);
                true
            }
            Some(_) => {
                debug!("keeping existing entry for {}", tv.ip_address);
                false
            }
        }
    }

    /// Number of collected candidates.
    pub fn len(&self) -> usize {
        self.devices.lock().expect("device sink poisoned").len()
    }

    /// Returns `true` when nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the sink, yielding the collected devices.
    pub fn into_devices(self) -> Vec<DiscoveredTv> {
        self.devices
            .into_inner()
            .expect("device sink poisoned")
            .into_values()
            .collect()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Runs discovery calls and single-target probes.
///
/// Explicitly constructed with its configuration and Local-Address Catalog
/// rather than living as a process-wide singleton.
pub struct DiscoveryEngine {
    config: ProxyConfig,
    catalog: LocalAddrCatalog,
}

impl DiscoveryEngine {
    pub fn new(config: ProxyConfig, catalog: LocalAddrCatalog) -> Self {
        Self { config, catalog }
    }

    /// Discovers TV candidates on the local network.
    ///
    /// Returns within `config.discovery_window` regardless of network
    /// responsiveness.  Never fails; timeout and genuine absence are
    /// indistinguishable in the returned data.
    pub async fn discover(&self) -> Vec<DiscoveredTv> {
        info!("starting TV discovery");
        let sink = DeviceSink::new(self.catalog.addrs().to_vec());

        {
            let probe = ssdp_probe::probe(&self.config, &sink);
            let sweep = net_sweep::sweep(&self.config, &self.catalog, &sink);
            let joined = futures_util::future::join(probe, sweep);
            if timeout(self.config.discovery_window, joined).await.is_err() {
                debug!("discovery window expired with a strategy still in flight");
            }
        }

        let devices = sink.into_devices();
        info!("discovery complete: {} device(s)", devices.len());
        devices
    }

    /// Probes one user-supplied address on the fixed control port.
    ///
    /// Returns `None` on timeout or connection error, within
    /// `config.ip_probe_timeout`.  Never returns an error.
    pub async fn probe_ip(&self, ip: Ipv4Addr) -> Option<DiscoveredTv> {
        net_sweep::probe_host(ip, self.config.tv_port, self.config.ip_probe_timeout).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
