//! Error types for the scatter client.

use thiserror::Error;

/// Errors that can occur in gateway and dispatch operations.
#[derive(Debug, Error)]
pub enum ScatterError {
    /// Transport-level failure: handshake, I/O, unexpected close.
    #[error("gateway connection failed: {0}")]
    GatewayConnection(String),

    /// The server rejected the bot token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// `connect()` was called while the run loop was already active.
    #[error("gateway is already running")]
    AlreadyRunning,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An event handler failed.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] scatter_proto::ProtoError),
}

impl ScatterError {
    /// Whether the run loop should back off and reconnect after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::GatewayConnection(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_connection_error_display() {
        let err = ScatterError::GatewayConnection("connection refused".to_string());
        assert_eq!(err.to_string(), "gateway connection failed: connection refused");
    }

    #[test]
    fn test_authentication_error_display() {
        let err = ScatterError::Authentication("Invalid token".to_string());
        assert_eq!(err.to_string(), "authentication failed: Invalid token");
    }

    #[test]
    fn test_connection_errors_are_recoverable() {
        assert!(ScatterError::GatewayConnection("reset".into()).is_recoverable());
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(ScatterError::from(io_err).is_recoverable());
    }

    #[test]
    fn test_fatal_errors_are_not_recoverable() {
        assert!(!ScatterError::Authentication("bad token".into()).is_recoverable());
        assert!(!ScatterError::AlreadyRunning.is_recoverable());
        assert!(!ScatterError::Config("empty url".into()).is_recoverable());
        assert!(!ScatterError::Dispatch("boom".into()).is_recoverable());
    }

    #[test]
    fn test_protocol_error_conversion() {
        let err: ScatterError = scatter_proto::ProtoError::MissingField("type").into();
        assert!(err.to_string().contains("missing required field: type"));
    }
}
