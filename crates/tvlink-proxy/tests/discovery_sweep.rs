//! Discovery integration tests over the loopback range.
//!
//! Linux routes the whole 127.0.0.0/8 block locally, so a listener bound to
//! 127.0.0.5 lets the real /24 sweep run against a controlled network with
//! exactly one "television" on it.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;

use tvlink_proxy::application::{DeviceSink, DiscoveryEngine};
use tvlink_proxy::domain::ProxyConfig;
use tvlink_proxy::infrastructure::local_addrs::LocalAddrCatalog;
use tvlink_proxy::infrastructure::net_sweep;

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn sweep_config(tv_port: u16) -> ProxyConfig {
    ProxyConfig {
        tv_port,
        sweep_timeout: Duration::from_millis(200),
        sweep_batch: 64,
        ..ProxyConfig::default()
    }
}

#[tokio::test]
async fn test_sweep_finds_the_one_listener_on_the_subnet() {
    // Arrange: one "television" at 127.0.0.5, the host itself at 127.0.0.1
    let listener = TcpListener::bind(("127.0.0.5", 0)).await.unwrap();
    let tv_port = listener.local_addr().unwrap().port();

    let config = sweep_config(tv_port);
    let catalog = LocalAddrCatalog::from_addrs(vec![ip("127.0.0.1")]);
    let sink = DeviceSink::new(catalog.addrs().to_vec());

    // Act
    net_sweep::sweep(&config, &catalog, &sink).await;

    // Assert: exactly one generic-named candidate at the listener's address
    let devices = sink.into_devices();
    assert_eq!(devices.len(), 1, "expected one device, got {devices:?}");
    assert_eq!(devices[0].ip_address, ip("127.0.0.5"));
    assert_eq!(devices[0].port, tv_port);
    assert_eq!(devices[0].name, "TV device at 127.0.0.5");
    assert!(!devices[0].has_specific_name());
}

#[tokio::test]
async fn test_sweep_excludes_the_host_itself() {
    // Arrange: the listener sits on the host's own catalogued address
    let listener = TcpListener::bind(("127.0.0.5", 0)).await.unwrap();
    let tv_port = listener.local_addr().unwrap().port();

    let config = sweep_config(tv_port);
    let catalog = LocalAddrCatalog::from_addrs(vec![ip("127.0.0.5")]);
    let sink = DeviceSink::new(catalog.addrs().to_vec());

    // Act
    net_sweep::sweep(&config, &catalog, &sink).await;

    // Assert: the host never lists itself
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_probe_ip_confirms_a_listening_target() {
    // Arrange
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let tv_port = listener.local_addr().unwrap().port();

    let config = ProxyConfig {
        tv_port,
        ip_probe_timeout: Duration::from_secs(3),
        ..ProxyConfig::default()
    };
    let engine = DiscoveryEngine::new(config, LocalAddrCatalog::from_addrs(vec![]));

    // Act
    let tv = engine.probe_ip(ip("127.0.0.1")).await.expect("probe must find the listener");

    // Assert: a user-verified address gets the specific display name
    assert_eq!(tv.ip_address, ip("127.0.0.1"));
    assert_eq!(tv.name, "LG TV at 127.0.0.1");
}

#[tokio::test]
async fn test_probe_ip_reports_absence_as_none() {
    // Arrange: a port with no listener
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let tv_port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ProxyConfig {
        tv_port,
        ip_probe_timeout: Duration::from_secs(3),
        ..ProxyConfig::default()
    };
    let engine = DiscoveryEngine::new(config, LocalAddrCatalog::from_addrs(vec![]));

    // Act / Assert
    assert!(engine.probe_ip(ip("127.0.0.1")).await.is_none());
}

#[tokio::test]
async fn test_discover_respects_the_wall_clock_bound() {
    // Arrange: a short window over the loopback subnet
    let config = ProxyConfig {
        discovery_window: Duration::from_millis(500),
        sweep_timeout: Duration::from_millis(100),
        sweep_batch: 64,
        ..ProxyConfig::default()
    };
    let engine = DiscoveryEngine::new(config, LocalAddrCatalog::from_addrs(vec![ip("127.0.0.1")]));

    // Act
    let start = Instant::now();
    let _devices = engine.discover().await;

    // Assert: the window plus scheduling slack, never the sum of strategies
    assert!(
        start.elapsed() < Duration::from_secs(3),
        "discovery ran past its window: {:?}",
        start.elapsed()
    );
}
