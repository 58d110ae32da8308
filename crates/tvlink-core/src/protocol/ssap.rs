//! The TV's JSON control protocol and the input-socket wire format.
//!
//! The device speaks a JSON request/response protocol over its primary
//! connection: `{type, id, uri?, payload?}` with observed types `register`,
//! `request`, `response`, and `error`.  The proxy treats all of it as opaque
//! traffic except for one exchange it initiates itself: asking the device for
//! the address of its secondary input channel, then writing line-oriented
//! button commands to that channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Service URI that asks the device for its pointer/input socket address.
pub const POINTER_INPUT_SOCKET_URI: &str =
    "ssap://com.webos.service.networkinput/getPointerInputSocket";

/// A message on the device's primary connection.
///
/// Unknown fields are preserved in `payload` only when the device puts them
/// there; the proxy never needs more than this envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsapMessage {
    /// Message type: `register`, `request`, `response`, or `error`.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Correlation id tying a `response` to its `request`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Service URI, present on requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Free-form payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl SsapMessage {
    /// Builds the negotiation request for the secondary input channel.
    pub fn input_socket_request(id: impl Into<String>) -> Self {
        Self {
            msg_type: "request".to_string(),
            id: Some(id.into()),
            uri: Some(POINTER_INPUT_SOCKET_URI.to_string()),
            payload: Some(Value::Object(serde_json::Map::new())),
        }
    }

    /// Returns the secondary-channel address if this is the matching reply.
    ///
    /// A reply matches when its correlation id equals `request_id` and its
    /// payload names a `socketPath`.  The path may be a full connection URL
    /// or a bare path; resolution against the primary connection is the
    /// caller's job.
    pub fn socket_path_for(&self, request_id: &str) -> Option<&str> {
        if self.id.as_deref() != Some(request_id) {
            return None;
        }
        self.payload.as_ref()?.get("socketPath")?.as_str()
    }
}

/// Encodes a button press in the secondary channel's line-oriented format.
///
/// Exactly three logical fields: the literal type marker, the button name,
/// and a blank terminating line.
pub fn encode_button(name: &str) -> String {
    format!("type:button\nname:{name}\n\n")
}

/// Generates a fresh correlation id with the given prefix.
pub fn new_correlation_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
