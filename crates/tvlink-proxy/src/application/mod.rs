//! Application layer for tvlink-proxy.
//!
//! Orchestrates discovery: runs the two strategies concurrently, owns the
//! call-local result set, and applies the merge-preference rule.  The
//! strategies themselves (socket I/O) live in the infrastructure layer.
//!
//! # What does NOT belong here?
//!
//! - Opening sockets (infrastructure)
//! - Frame vocabulary and parsing (tvlink-core)
//! - Relay session handling (infrastructure)

pub mod discovery;

pub use discovery::{DeviceSink, DiscoveryEngine};
