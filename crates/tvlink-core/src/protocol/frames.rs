//! JSON frames exchanged between relay clients and the proxy.
//!
//! Every frame is a JSON object whose `"type"` field selects the variant;
//! serde's `#[serde(tag = "type")]` handles the discriminant.  Inbound, the
//! proxy only ever interprets the `button` shorthand — any other client text
//! is forwarded to the device verbatim, which is why [`ClientCommand`] has a
//! single variant and a failed parse simply means "pass it through".
//!
//! Outbound frames:
//!
//! ```json
//! {"type":"proxy-status","status":"connected","message":"..."}
//! {"type":"proxy-error","error":"..."}
//! {"type":"error","error":"..."}
//! {"type":"response","id":"button_...","payload":{"returnValue":true,"button":"HOME"}}
//! ```

use serde::{Deserialize, Serialize};

use crate::protocol::ssap::new_correlation_id;

// ── Client → proxy ────────────────────────────────────────────────────────────

/// The one client message class the proxy intercepts.
///
/// Anything that fails to parse as this enum is opaque device traffic and is
/// relayed to the primary connection untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Low-latency button press, routed over the secondary input channel.
    #[serde(rename = "button")]
    Button {
        /// Button name, e.g. `HOME`, `ENTER`, `VOLUMEUP`.
        name: String,
    },
}

// ── Proxy → client ────────────────────────────────────────────────────────────

/// Structured frames the proxy sends to its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProxyFrame {
    /// Session-level status notification.
    #[serde(rename = "proxy-status")]
    Status {
        /// Status keyword; currently only `"connected"`.
        status: String,
        /// Human-readable detail.
        message: String,
    },

    /// Session-level failure (connection problems, missing parameters).
    #[serde(rename = "proxy-error")]
    Error {
        /// Human-readable error description.
        error: String,
    },

    /// Command-level failure (a button press that could not be delivered).
    ///
    /// The session and primary connection stay usable after this frame.
    #[serde(rename = "error")]
    CommandError {
        /// Human-readable error description.
        error: String,
    },

    /// Successful button delivery acknowledgement.
    #[serde(rename = "response")]
    Response {
        /// Freshly generated correlation id (`button_<id>`).
        id: String,
        /// Result payload echoing the button name.
        payload: ButtonResult,
    },
}

/// Payload of a successful button [`ProxyFrame::Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonResult {
    /// Always `true` in a success frame.
    pub return_value: bool,
    /// The button name that was delivered.
    pub button: String,
}

impl ProxyFrame {
    /// The frame sent once the primary device connection is open, before any
    /// traffic is forwarded.
    pub fn connected() -> Self {
        Self::Status {
            status: "connected".to_string(),
            message: "Successfully connected to TV".to_string(),
        }
    }

    /// A session-level error frame.
    pub fn session_error(error: impl Into<String>) -> Self {
        Self::Error { error: error.into() }
    }

    /// A command-level error frame.
    pub fn command_error(error: impl Into<String>) -> Self {
        Self::CommandError { error: error.into() }
    }

    /// A success acknowledgement for a delivered button press.
    pub fn button_delivered(button: &str) -> Self {
        Self::Response {
            id: new_correlation_id("button"),
            payload: ButtonResult {
                return_value: true,
                button: button.to_string(),
            },
        }
    }

    /// Serializes the frame to its JSON text representation.
    ///
    /// Serialization of these closed enum shapes cannot fail, so this returns
    /// the string directly.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_command_parses() {
        // Arrange: what a relay client sends for a button press
        let json = r#"{"type":"button","name":"HOME"}"#;

        // Act
        let cmd: ClientCommand = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(cmd, ClientCommand::Button { name: "HOME".to_string() });
    }

    #[test]
    fn test_non_button_message_fails_parse() {
        // A register message belongs to the opaque device protocol and must
        // not parse as a client command (it gets forwarded verbatim instead).
        let json = r#"{"type":"register","id":"reg_1","payload":{}}"#;
        let result: Result<ClientCommand, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_plain_text_fails_parse() {
        let result: Result<ClientCommand, _> = serde_json::from_str("hello");
        assert!(result.is_err());
    }

    #[test]
    fn test_connected_frame_shape() {
        // Act
        let json = ProxyFrame::connected().to_json();

        // Assert: exact external frame vocabulary
        assert!(json.contains(r#""type":"proxy-status""#));
        assert!(json.contains(r#""status":"connected""#));
        assert!(json.contains(r#""message":"#));
    }

    #[test]
    fn test_session_error_frame_shape() {
        let json = ProxyFrame::session_error("TV IP is required").to_json();
        assert!(json.contains(r#""type":"proxy-error""#));
        assert!(json.contains(r#""error":"TV IP is required""#));
    }

    #[test]
    fn test_command_error_frame_shape() {
        let json = ProxyFrame::command_error("input socket request timeout").to_json();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""error":"input socket request timeout""#));
    }

    #[test]
    fn test_button_response_frame_shape() {
        // Act
        let frame = ProxyFrame::button_delivered("ENTER");
        let json = frame.to_json();

        // Assert
        assert!(json.contains(r#""type":"response""#));
        assert!(json.contains(r#""id":"button_"#));
        assert!(json.contains(r#""returnValue":true"#));
        assert!(json.contains(r#""button":"ENTER""#));
    }

    #[test]
    fn test_button_response_ids_are_fresh() {
        let a = ProxyFrame::button_delivered("ENTER");
        let b = ProxyFrame::button_delivered("ENTER");
        match (a, b) {
            (ProxyFrame::Response { id: id_a, .. }, ProxyFrame::Response { id: id_b, .. }) => {
                assert_ne!(id_a, id_b);
            }
            other => panic!("expected Response frames, got {other:?}"),
        }
    }

    #[test]
    fn test_proxy_frame_round_trips() {
        let frame = ProxyFrame::button_delivered("HOME");
        let json = frame.to_json();
        let back: ProxyFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame, back);
    }
}
