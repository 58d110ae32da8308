//! TVLink proxy — entry point.
//!
//! This binary finds LG webOS televisions on the local network and relays
//! browser WebSocket sessions to them.  It exists because browsers cannot
//! talk to the televisions directly: the TV's secure control port presents a
//! self-signed certificate that browsers reject, and the low-latency button
//! channel requires a second negotiated connection browsers cannot manage.
//!
//! # Usage
//!
//! ```text
//! tvlink-proxy <COMMAND>
//!
//! Commands:
//!   serve     Run the WebSocket relay server
//!   discover  Scan the local network for televisions and print the results
//!   probe     Check one IP address for a listening television
//!
//! Options (shared):
//!   --bind <ADDR>        Relay bind address [default: 0.0.0.0]
//!   --port <PORT>        Relay listen port [default: 3001]
//!   --tv-port <PORT>     TV control port [default: 3001]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable              | Default   | Description                      |
//! |-----------------------|-----------|----------------------------------|
//! | `TVLINK_BIND`         | `0.0.0.0` | Relay bind address               |
//! | `TVLINK_PORT`         | `3001`    | Relay listen port                |
//! | `TVLINK_TV_PORT`      | `3001`    | TV control port                  |
//! | `TVLINK_DISCOVERY_WINDOW` | `5`   | Discovery window (secs)          |
//!
//! # Architecture overview
//!
//! ```text
//! Browser  (JSON over WebSocket, ?ip=&port= selects the target)
//!       ↕
//! tvlink-proxy  ← this process
//!   tvlink-core    device model, SSDP parsing, frame vocabulary
//!   domain/        ProxyConfig
//!   application/   discovery orchestration, result merging
//!   infrastructure/ SSDP probe, TCP sweep, relay server, session store
//!       ↕
//! LG webOS TV  (wss:// on port 3001, self-signed certificate)
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures_util::SinkExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tvlink_proxy::application::DiscoveryEngine;
use tvlink_proxy::domain::ProxyConfig;
use tvlink_proxy::infrastructure::local_addrs::LocalAddrCatalog;
use tvlink_proxy::infrastructure::ws_proxy::SharedTvSink;
use tvlink_proxy::infrastructure::{run_proxy, SessionStore};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Discovery and relay proxy for LG webOS televisions.
#[derive(Debug, Parser)]
#[command(
    name = "tvlink-proxy",
    about = "WebSocket relay and network discovery for LG webOS televisions",
    version
)]
struct Cli {
    /// IP address to bind the relay server to.
    ///
    /// Use `0.0.0.0` to accept connections from any interface, or
    /// `127.0.0.1` for local-only access.
    #[arg(long, default_value = "0.0.0.0", env = "TVLINK_BIND")]
    bind: String,

    /// TCP port for the relay server to listen on.
    #[arg(long, default_value_t = 3001, env = "TVLINK_PORT")]
    port: u16,

    /// The television's control port.
    ///
    /// Discovery scans this port and sessions default to it when the client
    /// omits `?port=`.  Connections to this port use `wss://`; any other
    /// port gets plain `ws://`.
    #[arg(long, default_value_t = 3001, env = "TVLINK_TV_PORT")]
    tv_port: u16,

    /// Discovery window in seconds.
    ///
    /// Hard wall-clock bound for one discovery call; whatever has been
    /// collected when it expires is the result.
    #[arg(long, default_value_t = 5, env = "TVLINK_DISCOVERY_WINDOW")]
    discovery_window: u64,

    /// Input-socket negotiation timeout in seconds.
    #[arg(long, default_value_t = 5, env = "TVLINK_NEGOTIATION_TIMEOUT")]
    negotiation_timeout: u64,

    /// Single-IP probe timeout in seconds (the `probe` command).
    #[arg(long, default_value_t = 3, env = "TVLINK_PROBE_TIMEOUT")]
    probe_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the WebSocket relay server until Ctrl+C.
    Serve,

    /// Scan the local network for televisions and print them as JSON.
    Discover,

    /// Check one IP address for a listening television.
    Probe {
        /// IPv4 address to probe on the TV control port.
        ip: Ipv4Addr,
    },
}

impl Cli {
    /// Converts the parsed arguments into a [`ProxyConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not a valid IP address.
    fn to_proxy_config(&self) -> anyhow::Result<ProxyConfig> {
        let ws_bind_addr: SocketAddr = format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("invalid bind address: '{}:{}'", self.bind, self.port))?;

        Ok(ProxyConfig {
            ws_bind_addr,
            tv_port: self.tv_port,
            discovery_window: Duration::from_secs(self.discovery_window),
            negotiation_timeout: Duration::from_secs(self.negotiation_timeout),
            ip_probe_timeout: Duration::from_secs(self.probe_timeout),
            ..ProxyConfig::default()
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level comes from RUST_LOG; `info` when absent or invalid.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.to_proxy_config()?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Discover => discover(config).await,
        Command::Probe { ip } => probe(config, ip).await,
    }
}

/// Runs the relay server until Ctrl+C, then closes every tracked
/// device-side connection.
async fn serve(config: ProxyConfig) -> anyhow::Result<()> {
    info!("TVLink proxy starting on {}", config.ws_bind_addr);

    let store: Arc<SessionStore<SharedTvSink>> = Arc::new(SessionStore::new());
    let running = Arc::new(AtomicBool::new(true));
    let running_signal = Arc::clone(&running);

    // The accept loop checks this flag every 200 ms and exits cleanly.
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; initiating graceful shutdown");
                running_signal.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_proxy(config, Arc::clone(&store), running).await?;

    // Sessions may still hold device connections; close them all.
    let handles = store.drain_all();
    info!("closing {} device connection(s)", handles.len());
    for handle in handles {
        let _ = handle.lock().await.close().await;
    }

    info!("TVLink proxy stopped");
    Ok(())
}

/// Runs one discovery call and prints the results as JSON.
async fn discover(config: ProxyConfig) -> anyhow::Result<()> {
    let catalog = LocalAddrCatalog::detect();
    let engine = DiscoveryEngine::new(config, catalog);

    let devices = engine.discover().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&devices).context("failed to serialize device list")?
    );
    Ok(())
}

/// Probes one address and prints the device as JSON, or fails.
async fn probe(config: ProxyConfig, ip: Ipv4Addr) -> anyhow::Result<()> {
    let catalog = LocalAddrCatalog::detect();
    let engine = DiscoveryEngine::new(config, catalog);

    match engine.probe_ip(ip).await {
        Some(tv) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&tv).context("failed to serialize device")?
            );
            Ok(())
        }
        None => anyhow::bail!("no TV found at {ip}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_serve_defaults() {
        // Arrange: parse with no options (all defaults apply)
        let cli = Cli::parse_from(["tvlink-proxy", "serve"]);

        // Assert
        assert_eq!(cli.bind, "0.0.0.0");
        assert_eq!(cli.port, 3001);
        assert_eq!(cli.tv_port, 3001);
        assert!(matches!(cli.command, Command::Serve));
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["tvlink-proxy", "--port", "9345", "serve"]);
        assert_eq!(cli.port, 9345);
    }

    #[test]
    fn test_cli_probe_requires_ip() {
        let result = Cli::try_parse_from(["tvlink-proxy", "probe"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_probe_parses_ip() {
        let cli = Cli::parse_from(["tvlink-proxy", "probe", "192.168.1.50"]);
        match cli.command {
            Command::Probe { ip } => assert_eq!(ip.to_string(), "192.168.1.50"),
            other => panic!("expected Probe, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_malformed_probe_ip() {
        let result = Cli::try_parse_from(["tvlink-proxy", "probe", "not-an-ip"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_to_proxy_config_defaults() {
        // Arrange
        let cli = Cli::parse_from(["tvlink-proxy", "serve"]);

        // Act
        let config = cli.to_proxy_config().unwrap();

        // Assert
        assert_eq!(config.ws_bind_addr.port(), 3001);
        assert_eq!(config.tv_port, 3001);
        assert_eq!(config.discovery_window, Duration::from_secs(5));
        assert_eq!(config.negotiation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_to_proxy_config_custom_window() {
        let cli = Cli::parse_from(["tvlink-proxy", "--discovery-window", "2", "discover"]);
        let config = cli.to_proxy_config().unwrap();
        assert_eq!(config.discovery_window, Duration::from_secs(2));
    }

    #[test]
    fn test_to_proxy_config_invalid_bind_returns_error() {
        let cli = Cli::parse_from(["tvlink-proxy", "--bind", "not.an.ip", "serve"]);
        let result = cli.to_proxy_config();
        assert!(result.is_err());
    }
}
