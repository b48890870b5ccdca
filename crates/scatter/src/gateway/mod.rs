//! Gateway WebSocket client.
//!
//! Manages the bot's single connection to the Scatter gateway, including
//! authentication, subscription replay and automatic reconnection with
//! exponential backoff.

mod client;
mod reconnect;
mod state;
mod subscriptions;
mod transport;

pub use client::Gateway;
pub use reconnect::{calculate_backoff, Backoff, ReconnectConfig};
pub use state::{AtomicSessionState, SessionState};
pub use subscriptions::SubscriptionTracker;
