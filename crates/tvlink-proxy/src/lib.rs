//! tvlink-proxy library crate.
//!
//! Finds LG webOS TVs on the local network and relays client WebSocket
//! sessions to them, negotiating the TV's secondary input channel for
//! low-latency button commands.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Relay client (JSON over WebSocket)
//!         ↕
//! [tvlink-proxy]
//!   ├── domain/           ProxyConfig — pure settings, no I/O
//!   ├── application/      DiscoveryEngine + DeviceSink (merge policy)
//!   └── infrastructure/
//!         ├── local_addrs    host interface catalog
//!         ├── ssdp_probe     multicast discovery strategy
//!         ├── net_sweep      active TCP sweep strategy
//!         ├── tv_conn        outbound device WebSockets (self-signed TLS)
//!         ├── session_store  primary/input connection tracking
//!         └── ws_proxy       relay accept loop and session handling
//!         ↕
//! LG webOS TV (wss://<ip>:3001, plus the negotiated input socket)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` owns the discovery orchestration and merge policy; its
//!   strategy I/O is delegated to `infrastructure`.
//! - `infrastructure` owns every socket.

/// Domain layer: runtime configuration.
pub mod domain;

/// Application layer: discovery orchestration and result merging.
pub mod application;

/// Infrastructure layer: sockets, TLS, and the relay server.
pub mod infrastructure;
