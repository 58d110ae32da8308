//! Wire vocabulary for the proxy and the device control protocol.
//!
//! Two protocols meet in the proxy:
//!
//! - **Client side** ([`frames`]): the JSON frames exchanged with relay
//!   clients — the `button` shorthand inbound, and the `proxy-status` /
//!   `proxy-error` / `error` / `response` frames outbound.
//! - **Device side** ([`ssap`]): the TV's own JSON request/response protocol,
//!   treated as opaque payload except for the input-socket negotiation the
//!   proxy performs itself, plus the line-oriented text command written to
//!   the secondary input channel.

pub mod frames;
pub mod ssap;

pub use frames::{ClientCommand, ProxyFrame};
pub use ssap::SsapMessage;
