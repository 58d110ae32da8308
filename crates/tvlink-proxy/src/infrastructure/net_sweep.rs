//! Active TCP-sweep discovery strategy and the single-target probe.
//!
//! Walks the host's /24 attempting a bare TCP connect to the fixed control
//! port for every host octet 1..=254, excluding the host's own addresses.  A
//! successful connect is sufficient evidence — no payload is exchanged — and
//! yields a generic-named candidate.
//!
//! Attempts are batched so only a bounded number are in flight at once, and
//! every attempt carries its own timeout, so no attempt can hang past its
//! deadline and the whole sweep resolves even on a silent network.

use std::net::Ipv4Addr;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use tvlink_core::DiscoveredTv;

use crate::application::discovery::DeviceSink;
use crate::domain::ProxyConfig;
use crate::infrastructure::local_addrs::LocalAddrCatalog;

/// Sweeps the catalog's /24 for hosts answering on the control port.
///
/// Skipped (with a log line) when the catalog has no IPv4 interface to
/// derive a subnet from.
pub async fn sweep(config: &ProxyConfig, catalog: &LocalAddrCatalog, sink: &DeviceSink) {
    let Some(base) = catalog.subnet_base() else {
        debug!("sweep: no local subnet, skipping");
        return;
    };
    sweep_subnet(base, config, catalog, sink).await;
}

/// Sweeps an explicit /24, separated from [`sweep`] so tests can target the
/// loopback range.
pub async fn sweep_subnet(
    base: [u8; 3],
    config: &ProxyConfig,
    catalog: &LocalAddrCatalog,
    sink: &DeviceSink,
) {
    debug!(
        "sweep: scanning {}.{}.{}.0/24 on port {}",
        base[0], base[1], base[2], config.tv_port
    );

    let hosts: Vec<Ipv4Addr> = (1u8..=254)
        .map(|octet| Ipv4Addr::new(base[0], base[1], base[2], octet))
        .filter(|ip| !catalog.contains(*ip))
        .collect();

    for chunk in hosts.chunks(config.sweep_batch.max(1)) {
        let attempts = chunk
            .iter()
            .map(|ip| try_connect(*ip, config.tv_port, config.sweep_timeout));
        for ip in join_all(attempts).await.into_iter().flatten() {
            sink.offer(DiscoveredTv::generic(ip, config.tv_port));
        }
    }

    debug!("sweep: complete");
}

/// Probes one user-supplied address with the longer verification timeout.
///
/// Returns `None` on timeout or connection error — absence, not failure.
pub async fn probe_host(ip: Ipv4Addr, port: u16, probe_timeout: Duration) -> Option<DiscoveredTv> {
    let ip = try_connect(ip, port, probe_timeout).await?;
    debug!("probe: {ip}:{port} answered");
    Some(DiscoveredTv::specific(ip, port))
}

/// One bounded connect attempt.  `Some(ip)` on success; timeout and
/// connection error both collapse to `None`.
async fn try_connect(ip: Ipv4Addr, port: u16, deadline: Duration) -> Option<Ipv4Addr> {
    match timeout(deadline, TcpStream::connect((ip, port))).await {
        Ok(Ok(_stream)) => Some(ip),
        Ok(Err(_)) | Err(_) => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_try_connect_succeeds_against_listener() {
        // Arrange: a real listener on an OS-assigned port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Act
        let hit = try_connect(Ipv4Addr::LOCALHOST, port, Duration::from_millis(500)).await;

        // Assert
        assert_eq!(hit, Some(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_try_connect_refused_returns_none_quickly() {
        // Arrange: bind then drop to obtain a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        // Act
        let start = Instant::now();
        let hit = try_connect(Ipv4Addr::LOCALHOST, port, Duration::from_secs(3)).await;

        // Assert: refused well before the deadline, and no device reported
        assert_eq!(hit, None);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_probe_host_yields_specific_candidate() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Act
        let tv = probe_host(Ipv4Addr::LOCALHOST, port, Duration::from_secs(3))
            .await
            .expect("listener must be found");

        // Assert
        assert_eq!(tv.ip_address, Ipv4Addr::LOCALHOST);
        assert!(tv.has_specific_name());
    }

    #[tokio::test]
    async fn test_probe_host_absent_returns_none_within_bound() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let start = Instant::now();
        let tv = probe_host(Ipv4Addr::LOCALHOST, port, Duration::from_secs(3)).await;

        assert!(tv.is_none());
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
