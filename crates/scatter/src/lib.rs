//! Scatter - bot client for the Scatter chat platform
//!
//! Keeps one authenticated WebSocket session to the Scatter gateway alive,
//! replays channel and space subscriptions after every reconnect, and routes
//! inbound events to registered handlers.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scatter::{Dispatcher, Event, Gateway};
//!
//! # async fn run() -> Result<(), scatter::ScatterError> {
//! let dispatcher = Arc::new(Dispatcher::new());
//! dispatcher.on("message", |event: Event| async move {
//!     if let Some(message) = event.as_message() {
//!         println!("{}: {}", message.author.name(), message.content);
//!     }
//!     Ok(())
//! });
//!
//! let gateway = Arc::new(Gateway::new("scatter_bot_token", dispatcher));
//! gateway.track_channel("general");
//! gateway.connect().await
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;

pub use config::{token_from_env, GatewayConfig};
pub use dispatch::{Dispatch, DispatchFuture, Dispatcher};
pub use error::ScatterError;
pub use gateway::{Gateway, ReconnectConfig, SessionState};

pub use scatter_proto::{
    ClientFrame, Channel, ChannelCategory, Event, InboundFrame, Message, Role, User,
};
