//! Domain layer for tvlink-proxy.
//!
//! Pure configuration types with no dependencies on I/O, sockets, or the
//! async runtime, so they can be constructed freely in tests.

pub mod config;

pub use config::ProxyConfig;
