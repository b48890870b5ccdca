//! The gateway connection manager.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use scatter_proto::{ClientFrame, FrameClass, InboundFrame};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::dispatch::Dispatch;
use crate::error::ScatterError;

use super::reconnect::Backoff;
use super::state::{AtomicSessionState, SessionState};
use super::subscriptions::SubscriptionTracker;
use super::transport::{self, TransportSink, TransportStream};

// Reasons a session ends without an error.
const CLOSED_BY_CLIENT: &str = "gateway closed";
const CLOSED_BY_SERVER: &str = "connection closed";

/// A resilient, authenticated connection to the Scatter gateway.
///
/// [`connect`](Self::connect) runs the connection loop: open the transport,
/// authenticate, receive frames, and on any connection-level failure back off
/// and start over. Share the gateway through an [`Arc`] so another task can
/// [`send`](Self::send), track subscriptions, or [`close`](Self::close) it
/// while the loop runs.
pub struct Gateway {
    token: String,
    config: GatewayConfig,
    dispatch: Arc<dyn Dispatch>,
    state: AtomicSessionState,
    subscriptions: SubscriptionTracker,
    backoff: Mutex<Backoff>,
    user_id: RwLock<Option<String>>,
    /// The one open transport writer, if any. Every write goes through here.
    writer: AsyncMutex<Option<TransportSink>>,
    running: AtomicBool,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("subscriptions", &self.subscriptions)
            .field("dispatch", &"<callback>")
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a gateway with the default configuration.
    #[must_use]
    pub fn new(token: impl Into<String>, dispatch: Arc<dyn Dispatch>) -> Self {
        let config = GatewayConfig::default();
        Self {
            token: token.into(),
            backoff: Mutex::new(Backoff::new(&config.reconnect)),
            config,
            dispatch,
            state: AtomicSessionState::new(SessionState::Disconnected),
            subscriptions: SubscriptionTracker::new(),
            user_id: RwLock::new(None),
            writer: AsyncMutex::new(None),
            running: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.backoff = Mutex::new(Backoff::new(&config.reconnect));
        self.config = config;
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// User id reported by the last `auth_ok`.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }

    /// The delay the next connection failure will wait.
    #[must_use]
    pub fn current_backoff(&self) -> Duration {
        self.backoff.lock().current()
    }

    /// Run the connection loop until [`close`](Self::close) is called.
    ///
    /// Connection-level failures are retried forever with exponential
    /// backoff. Returns `Ok(())` once closed.
    ///
    /// # Errors
    ///
    /// Returns [`ScatterError::Config`] if the configuration is invalid,
    /// [`ScatterError::Authentication`] if the server rejects the token, and
    /// [`ScatterError::AlreadyRunning`] if the loop is already running on
    /// another task.
    pub async fn connect(&self) -> Result<(), ScatterError> {
        self.config.validate()?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ScatterError::AlreadyRunning);
        }
        let result = self.run().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self) -> Result<(), ScatterError> {
        while !self.is_closed() {
            let outcome = self.run_session().await;
            self.state.advance(SessionState::Disconnected);

            let reason = match outcome {
                Ok(reason) => reason,
                Err(e) if e.is_recoverable() => e.to_string(),
                Err(e) => return Err(e),
            };
            if self.is_closed() {
                break;
            }

            let delay = self.backoff.lock().next_delay();
            warn!(
                reason = %reason,
                delay_ms = delay.as_millis() as u64,
                "gateway disconnected, reconnecting"
            );

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = sleep(delay) => {}
            }
        }

        debug!("gateway loop stopped");
        Ok(())
    }

    /// One connect → authenticate → receive cycle. The transport is always
    /// torn down before returning.
    async fn run_session(&self) -> Result<String, ScatterError> {
        self.state.advance(SessionState::Connecting);

        let (sink, mut stream) = tokio::select! {
            () = self.shutdown.cancelled() => return Ok(CLOSED_BY_CLIENT.to_string()),
            opened = transport::open(&self.config.ws_url, self.config.connect_timeout()) => opened?,
        };

        {
            let mut writer = self.writer.lock().await;
            // close() flips the flag before taking this lock, so one of us
            // always sees the other and the sink is never leaked.
            if self.is_closed() {
                drop(writer);
                sink.close().await;
                return Ok(CLOSED_BY_CLIENT.to_string());
            }
            *writer = Some(sink);
        }

        self.state.advance(SessionState::Authenticating);
        let outcome = match self.send(&ClientFrame::auth(self.token.as_str())).await {
            Ok(()) => self.receive_loop(&mut stream).await,
            Err(e) => Err(e),
        };

        self.release_transport().await;
        outcome
    }

    async fn receive_loop(&self, stream: &mut TransportStream) -> Result<String, ScatterError> {
        loop {
            let received = tokio::select! {
                () = self.shutdown.cancelled() => return Ok(CLOSED_BY_CLIENT.to_string()),
                received = stream.recv() => received?,
            };
            let Some(frame) = received else {
                return Ok(CLOSED_BY_SERVER.to_string());
            };

            match frame.classify() {
                FrameClass::AuthOk => self.on_authenticated(frame).await?,
                FrameClass::AuthFailure(message) => {
                    error!(message = %message, "gateway rejected credentials");
                    return Err(ScatterError::Authentication(message));
                }
                FrameClass::ServerError(message) => {
                    error!(message = %message, "gateway error");
                    self.dispatch(frame).await;
                }
                FrameClass::Event => self.dispatch(frame).await,
            }
        }
    }

    async fn on_authenticated(&self, frame: InboundFrame) -> Result<(), ScatterError> {
        self.state.advance(SessionState::Connected);
        self.backoff.lock().reset();

        let user_id = frame.user_id().map(str::to_owned);
        info!(user_id = user_id.as_deref().unwrap_or("unknown"), "authenticated");
        *self.user_id.write() = user_id;

        let frames = self.subscriptions.resubscribe_frames();
        if !frames.is_empty() {
            debug!(count = frames.len(), "re-subscribing");
        }
        for frame in &frames {
            self.send(frame).await?;
        }

        self.dispatch(frame).await;
        Ok(())
    }

    /// Hand a frame to the dispatcher. Handler errors and panics are logged
    /// and go no further.
    async fn dispatch(&self, frame: InboundFrame) {
        let (event, payload) = frame.into_parts();
        let dispatch = &self.dispatch;
        let result = AssertUnwindSafe(async { dispatch.dispatch(&event, payload).await })
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(event = %event, error = %e, "event handler failed"),
            Err(_) => error!(event = %event, "event handler panicked"),
        }
    }

    async fn release_transport(&self) {
        let sink = self.writer.lock().await.take();
        if let Some(sink) = sink {
            sink.close().await;
        }
    }

    /// Serialize and write a frame on the active transport.
    ///
    /// Frames sent while no transport is open, or while closing, are dropped:
    /// there is no queue. A write stalled on a peer that stopped reading is
    /// abandoned as soon as [`close`](Self::close) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be serialized, or the write fails
    /// or times out.
    pub async fn send<F: Serialize + ?Sized>(&self, frame: &F) -> Result<(), ScatterError> {
        let text = serde_json::to_string(frame)
            .map_err(|e| scatter_proto::ProtoError::Encoding(e.to_string()))?;

        let mut writer = tokio::select! {
            () = self.shutdown.cancelled() => {
                debug!("gateway closing, dropping frame");
                return Ok(());
            }
            writer = self.writer.lock() => writer,
        };
        let Some(sink) = writer.as_mut().filter(|_| !self.is_closed()) else {
            debug!("no active transport, dropping frame");
            return Ok(());
        };

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => {
                debug!("gateway closing, abandoning write");
                Ok(())
            }
            sent = sink.send_text(text) => sent,
        }
    }

    /// Track a channel for resubscription after every authentication.
    /// Sends nothing by itself.
    pub fn track_channel(&self, channel_id: impl Into<String>) {
        self.subscriptions.track_channel(channel_id);
    }

    /// Stop tracking a channel. Sends nothing.
    pub fn untrack_channel(&self, channel_id: &str) {
        self.subscriptions.untrack_channel(channel_id);
    }

    /// Track a space for resubscription after every authentication.
    /// Sends nothing by itself.
    pub fn track_space(&self, space_id: impl Into<String>) {
        self.subscriptions.track_space(space_id);
    }

    /// Stop tracking a space. Sends nothing.
    pub fn untrack_space(&self, space_id: &str) {
        self.subscriptions.untrack_space(space_id);
    }

    /// Tracked channel ids, sorted.
    #[must_use]
    pub fn tracked_channels(&self) -> Vec<String> {
        self.subscriptions.channels()
    }

    /// Tracked space ids, sorted.
    #[must_use]
    pub fn tracked_spaces(&self) -> Vec<String> {
        self.subscriptions.spaces()
    }

    /// Track a channel and, when already authenticated, subscribe right away.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscribe frame cannot be written.
    pub async fn subscribe_channel(&self, channel_id: impl Into<String>) -> Result<(), ScatterError> {
        let channel_id = channel_id.into();
        self.track_channel(channel_id.clone());
        if self.state() == SessionState::Connected {
            self.send(&ClientFrame::subscribe(channel_id)).await?;
        }
        Ok(())
    }

    /// Track a space and, when already authenticated, subscribe right away.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscribe frame cannot be written.
    pub async fn subscribe_space(&self, space_id: impl Into<String>) -> Result<(), ScatterError> {
        let space_id = space_id.into();
        self.track_space(space_id.clone());
        if self.state() == SessionState::Connected {
            self.send(&ClientFrame::subscribe_space(space_id)).await?;
        }
        Ok(())
    }

    /// Close the gateway for good.
    ///
    /// Stops the connection loop, closes the open transport and makes later
    /// calls to [`connect`](Self::connect) return immediately. Calling it
    /// again is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.state.advance(SessionState::Closing);
        self.shutdown.cancel();
        self.release_transport().await;
        self.state.advance(SessionState::Closed);
        info!("gateway closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ReconnectConfig;
    use serde_json::{json, Value};

    fn noop_dispatch() -> Arc<dyn Dispatch> {
        Arc::new(|_event: String, _payload: Value| async { Ok::<(), ScatterError>(()) })
    }

    #[test]
    fn test_gateway_creation() {
        let gateway = Gateway::new("token", noop_dispatch());
        assert_eq!(gateway.state(), SessionState::Disconnected);
        assert!(!gateway.is_closed());
        assert!(gateway.user_id().is_none());
        assert_eq!(gateway.config().ws_url, crate::config::DEFAULT_WS_URL);
        assert_eq!(gateway.current_backoff(), Duration::from_secs(1));
    }

    #[test]
    fn test_with_config_resets_backoff_floor() {
        let config = GatewayConfig::default().with_reconnect(ReconnectConfig::new(
            Duration::from_millis(50),
            Duration::from_secs(2),
        ));
        let gateway = Gateway::new("token", noop_dispatch()).with_config(config);
        assert_eq!(gateway.current_backoff(), Duration::from_millis(50));
    }

    #[test]
    fn test_track_and_untrack() {
        let gateway = Gateway::new("token", noop_dispatch());
        gateway.track_channel("c2");
        gateway.track_channel("c1");
        gateway.track_channel("c1");
        gateway.track_space("s1");
        gateway.untrack_channel("c2");
        gateway.untrack_space("missing");

        assert_eq!(gateway.tracked_channels(), vec!["c1".to_string()]);
        assert_eq!(gateway.tracked_spaces(), vec!["s1".to_string()]);
    }

    #[test]
    fn test_debug_hides_token() {
        let gateway = Gateway::new("scatter_bot_secret", noop_dispatch());
        let debug = format!("{gateway:?}");
        assert!(!debug.contains("scatter_bot_secret"));
    }

    #[tokio::test]
    async fn test_connect_rejects_zero_floor() {
        let config = GatewayConfig::default()
            .with_ws_url("ws://127.0.0.1:9")
            .with_reconnect(ReconnectConfig::new(Duration::ZERO, Duration::from_secs(1)));
        let gateway = Gateway::new("token", noop_dispatch()).with_config(config);

        let result = tokio::time::timeout(Duration::from_secs(1), gateway.connect()).await;
        assert!(matches!(result, Ok(Err(ScatterError::Config(_)))));
        assert_eq!(gateway.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_rejects_zero_connect_timeout() {
        let config = GatewayConfig::default().with_connect_timeout(Duration::from_micros(10));
        let gateway = Gateway::new("token", noop_dispatch()).with_config(config);

        let result = tokio::time::timeout(Duration::from_secs(1), gateway.connect()).await;
        assert!(matches!(result, Ok(Err(ScatterError::Config(_)))));
    }

    #[tokio::test]
    async fn test_send_after_close_is_dropped() {
        let gateway = Gateway::new("token", noop_dispatch());
        gateway.close().await;
        assert!(gateway.send(&json!({"type": "typing"})).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_without_transport_is_dropped() {
        let gateway = Gateway::new("token", noop_dispatch());
        let result = gateway.send(&json!({"type": "typing", "channel_id": "c1"})).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_while_disconnected_only_tracks() {
        let gateway = Gateway::new("token", noop_dispatch());
        gateway.subscribe_channel("c1").await.unwrap();
        gateway.subscribe_space("s1").await.unwrap();
        assert_eq!(gateway.tracked_channels(), vec!["c1".to_string()]);
        assert_eq!(gateway.tracked_spaces(), vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn test_close_twice_without_connection() {
        let gateway = Gateway::new("token", noop_dispatch());
        gateway.close().await;
        gateway.close().await;

        assert!(gateway.is_closed());
        assert_eq!(gateway.state(), SessionState::Closed);
        assert!(gateway.writer.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_after_close_returns_immediately() {
        let gateway = Gateway::new("token", noop_dispatch());
        gateway.close().await;

        let result = tokio::time::timeout(Duration::from_secs(1), gateway.connect()).await;
        assert!(matches!(result, Ok(Ok(()))));
        assert_eq!(gateway.state(), SessionState::Closed);
    }
}
