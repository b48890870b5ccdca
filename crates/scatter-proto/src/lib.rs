//! # scatter-proto
//!
//! Wire protocol definitions for the Scatter bot gateway: outbound and
//! inbound frames, the event-name table, and the typed records that known
//! events are parsed into.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod frames;
pub mod models;
pub mod types;

pub use error::ProtoError;
pub use events::{handler_key, parse_event, Event, EVENT_MAP};
pub use frames::{ClientFrame, FrameClass, InboundFrame};
pub use models::{Channel, ChannelCategory, Message, Role, User};
pub use types::{ChannelType, Permission, PresenceStatus};
