//! Session state types.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of the gateway session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport open.
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Transport open, waiting for `auth_ok`.
    Authenticating,
    /// Authenticated and receiving events.
    Connected,
    /// `close()` in progress.
    Closing,
    /// Closed for good.
    Closed,
}

impl SessionState {
    /// Whether the state is terminal or on its way there.
    #[must_use]
    pub const fn is_shutting_down(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Atomic wrapper for session state.
#[derive(Debug)]
pub struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    /// Create a new atomic state.
    #[must_use]
    pub const fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Load the current state.
    #[must_use]
    pub fn load(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::Disconnected,
            1 => SessionState::Connecting,
            2 => SessionState::Authenticating,
            3 => SessionState::Connected,
            4 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }

    /// Store `state` unless the session is already closing or closed.
    pub fn advance(&self, state: SessionState) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let closing = current >= SessionState::Closing as u8;
                (!closing || state.is_shutting_down()).then_some(state as u8)
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_enum() {
        assert_eq!(SessionState::Disconnected as u8, 0);
        assert_eq!(SessionState::Connecting as u8, 1);
        assert_eq!(SessionState::Authenticating as u8, 2);
        assert_eq!(SessionState::Connected as u8, 3);
        assert_eq!(SessionState::Closing as u8, 4);
        assert_eq!(SessionState::Closed as u8, 5);
    }

    #[test]
    fn test_atomic_session_state() {
        let state = AtomicSessionState::new(SessionState::Disconnected);
        assert_eq!(state.load(), SessionState::Disconnected);

        state.advance(SessionState::Authenticating);
        assert_eq!(state.load(), SessionState::Authenticating);

        state.advance(SessionState::Connected);
        assert_eq!(state.load(), SessionState::Connected);
    }

    #[test]
    fn test_advance_does_not_leave_shutdown() {
        let state = AtomicSessionState::new(SessionState::Connected);
        state.advance(SessionState::Closing);
        assert_eq!(state.load(), SessionState::Closing);

        state.advance(SessionState::Disconnected);
        assert_eq!(state.load(), SessionState::Closing);

        state.advance(SessionState::Closed);
        assert_eq!(state.load(), SessionState::Closed);

        state.advance(SessionState::Connecting);
        assert_eq!(state.load(), SessionState::Closed);
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::Authenticating.to_string(), "authenticating");
        assert!(SessionState::Closed.is_shutting_down());
        assert!(!SessionState::Connected.is_shutting_down());
    }
}
