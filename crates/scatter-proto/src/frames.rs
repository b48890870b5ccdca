//! Gateway frame definitions.
//!
//! Every frame on the wire is a JSON object tagged by a `type` field. The
//! client sends a small closed set of frames ([`ClientFrame`]); the server
//! sends an open set, so inbound frames are kept as raw JSON
//! ([`InboundFrame`]) and only inspected as far as routing requires.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// Wire type of the authentication acknowledgment.
pub const AUTH_OK: &str = "auth_ok";

/// Wire type of server-reported errors.
pub const ERROR: &str = "error";

/// Message used when an error frame carries no `message` field.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Frames sent from the bot to the gateway.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Authenticate the connection with a bot token.
    Auth {
        /// Bot credential.
        token: String,
    },
    /// Subscribe to a channel's events.
    Subscribe {
        /// Channel ID.
        channel_id: String,
    },
    /// Subscribe to a space's events.
    SubscribeSpace {
        /// Space ID.
        space_id: String,
    },
}

impl ClientFrame {
    /// Create an auth frame.
    #[must_use]
    pub fn auth(token: impl Into<String>) -> Self {
        Self::Auth {
            token: token.into(),
        }
    }

    /// Create a channel subscribe frame.
    #[must_use]
    pub fn subscribe(channel_id: impl Into<String>) -> Self {
        Self::Subscribe {
            channel_id: channel_id.into(),
        }
    }

    /// Create a space subscribe frame.
    #[must_use]
    pub fn subscribe_space(space_id: impl Into<String>) -> Self {
        Self::SubscribeSpace {
            space_id: space_id.into(),
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for ClientFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth { .. } => f.debug_struct("Auth").field("token", &"<redacted>").finish(),
            Self::Subscribe { channel_id } => f
                .debug_struct("Subscribe")
                .field("channel_id", channel_id)
                .finish(),
            Self::SubscribeSpace { space_id } => f
                .debug_struct("SubscribeSpace")
                .field("space_id", space_id)
                .finish(),
        }
    }
}

/// How the gateway should treat an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameClass {
    /// The server accepted our credential.
    AuthOk,
    /// The server rejected our credential. Carries the server's message.
    AuthFailure(String),
    /// Any other server-reported error. Carries the server's message.
    ServerError(String),
    /// A domain event to hand to the dispatcher.
    Event,
}

/// A frame received from the gateway.
///
/// The payload is the full JSON object, `type` field included.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    kind: String,
    payload: Value,
}

impl InboundFrame {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or has no string `type` field.
    pub fn from_json(text: &str) -> Result<Self, ProtoError> {
        let payload: Value =
            serde_json::from_str(text).map_err(|e| ProtoError::Decoding(e.to_string()))?;
        Self::from_value(payload)
    }

    /// Wrap an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value has no string `type` field.
    pub fn from_value(payload: Value) -> Result<Self, ProtoError> {
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtoError::MissingField("type"))?
            .to_owned();
        Ok(Self { kind, payload })
    }

    /// The raw wire type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The full JSON payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Split into wire type and payload.
    #[must_use]
    pub fn into_parts(self) -> (String, Value) {
        (self.kind, self.payload)
    }

    /// Classify the frame for the gateway's receive loop.
    ///
    /// An error frame counts as an authentication failure when its message
    /// mentions "auth" or "token", compared case-insensitively.
    #[must_use]
    pub fn classify(&self) -> FrameClass {
        match self.kind.as_str() {
            AUTH_OK => FrameClass::AuthOk,
            ERROR => {
                let message = self.error_message().to_owned();
                let lowered = message.to_lowercase();
                if lowered.contains("auth") || lowered.contains("token") {
                    FrameClass::AuthFailure(message)
                } else {
                    FrameClass::ServerError(message)
                }
            }
            _ => FrameClass::Event,
        }
    }

    /// The `message` field of an error frame, or a placeholder.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ERROR)
    }

    /// The `user_id` field, present on `auth_ok`.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.payload.get("user_id").and_then(Value::as_str)
    }
}
