//! Infrastructure layer for tvlink-proxy.
//!
//! Everything that touches a socket lives here: the discovery strategy I/O,
//! the host interface catalog, outbound device WebSockets with their TLS
//! policy, connection tracking, and the relay server.
//!
//! # What does NOT belong here?
//!
//! - The merge-preference rule and discovery orchestration (application)
//! - Frame and protocol definitions (tvlink-core)
//! - Configuration parsing (main.rs)

pub mod local_addrs;
pub mod net_sweep;
pub mod session_store;
pub mod ssdp_probe;
pub mod tv_conn;
pub mod ws_proxy;

pub use session_store::SessionStore;
pub use ws_proxy::run_proxy;
