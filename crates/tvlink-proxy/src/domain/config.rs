//! Proxy configuration.
//!
//! [`ProxyConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from CLI arguments and shared via `Arc`; the
//! defaults match the original deployment (TV control port 3001, 5-second
//! discovery window) and are suitable for local development and tests.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// All runtime configuration for discovery and the relay server.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address the relay WebSocket server binds to.
    pub ws_bind_addr: SocketAddr,

    /// The fixed control port webOS TVs listen on.
    ///
    /// Used as the sweep target, the default relay target port, and the
    /// port that selects `wss://` over `ws://` for device connections.
    pub tv_port: u16,

    /// Hard wall-clock bound for one discovery call.
    ///
    /// Both strategies are joined under this bound; whatever has been
    /// collected when it expires is returned.
    pub discovery_window: Duration,

    /// Delay between successive multicast search messages.
    ///
    /// Staggering reduces packet collisions and improves delivery odds.
    pub probe_stagger: Duration,

    /// Per-host connect timeout during the active sweep.
    pub sweep_timeout: Duration,

    /// Maximum in-flight connect attempts during the sweep.
    ///
    /// Bounds file-descriptor and ephemeral-port usage.
    pub sweep_batch: usize,

    /// Connect timeout for the single-target probe of a user-supplied IP.
    pub ip_probe_timeout: Duration,

    /// How long a button command waits for the TV to answer the
    /// input-socket negotiation request on the primary connection.
    pub negotiation_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3001)),
            tv_port: 3001,
            discovery_window: Duration::from_secs(5),
            probe_stagger: Duration::from_millis(500),
            sweep_timeout: Duration::from_millis(500),
            sweep_batch: 20,
            ip_probe_timeout: Duration::from_secs(3),
            negotiation_timeout: Duration::from_secs(5),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tv_port_is_3001() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.tv_port, 3001);
    }

    #[test]
    fn test_default_bind_port_is_3001() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.ws_bind_addr.port(), 3001);
    }

    #[test]
    fn test_default_discovery_window_is_5s() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.discovery_window, Duration::from_secs(5));
    }

    #[test]
    fn test_default_sweep_parameters() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.sweep_timeout, Duration::from_millis(500));
        assert_eq!(cfg.sweep_batch, 20);
    }

    #[test]
    fn test_default_probe_and_negotiation_timeouts() {
        let cfg = ProxyConfig::default();
        assert_eq!(cfg.ip_probe_timeout, Duration::from_secs(3));
        assert_eq!(cfg.negotiation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_can_be_cloned_for_arc_sharing() {
        let cfg = ProxyConfig::default();
        let cloned = cfg.clone();
        assert_eq!(cfg.ws_bind_addr, cloned.ws_bind_addr);
        assert_eq!(cfg.sweep_batch, cloned.sweep_batch);
    }
}
