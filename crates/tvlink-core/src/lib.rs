//! tvlink-core library crate.
//!
//! Pure domain and protocol types shared by the TVLink discovery engine and
//! proxy session manager.  Nothing in this crate performs I/O or depends on an
//! async runtime, which keeps the classification rules, frame vocabulary, and
//! probe parsing testable in isolation.
//!
//! # Contents
//!
//! ```text
//! [tvlink-core]
//!   ├── device.rs          DiscoveredTv + display-name/merge policy
//!   ├── classify.rs        probe-reply classification rule table
//!   ├── ssdp.rs            SSDP search messages and reply parsing
//!   └── protocol/
//!         ├── frames.rs    client/proxy JSON frames
//!         └── ssap.rs      device control messages + input-socket wire format
//! ```

/// Discovered-device type and naming/merge policy.
pub mod device;

/// Declarative probe-reply classification rules.
pub mod classify;

/// SSDP search messages and probe-reply parsing.
pub mod ssdp;

/// JSON frame vocabulary and the device control protocol.
pub mod protocol;

pub use device::DiscoveredTv;
