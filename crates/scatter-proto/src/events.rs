//! Event-name table and event parsing.
//!
//! Raw wire types are normalized into handler keys (`new_message` becomes
//! `message`). Types missing from the table keep their wire name, so events
//! added server-side still reach a handler registered under that name.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ProtoError;
use crate::models::{Channel, ChannelCategory, Message, Role, User};

/// Wire type to handler key.
pub const EVENT_MAP: &[(&str, &str)] = &[
    // auth / control
    ("auth_ok", "ready"),
    ("error", "error"),
    ("subscribed", "subscribed"),
    // channel events
    ("new_message", "message"),
    ("message_edited", "message_edit"),
    ("message_deleted", "message_delete"),
    ("typing", "typing"),
    ("embeds_resolved", "embeds_resolved"),
    ("message_pinned", "message_pinned"),
    ("message_unpinned", "message_unpinned"),
    ("reaction_added", "reaction_add"),
    ("reaction_removed", "reaction_remove"),
    // space events
    ("member_joined", "member_join"),
    ("member_left", "member_remove"),
    ("presence_changed", "presence_update"),
    ("member_profile_updated", "member_update"),
    ("channel_created", "channel_create"),
    ("channel_updated", "channel_update"),
    ("channel_deleted", "channel_delete"),
    ("channel_permissions_updated", "channel_permissions_update"),
    ("role_created", "role_create"),
    ("role_updated", "role_update"),
    ("role_deleted", "role_delete"),
    ("member_roles_updated", "member_roles_update"),
    ("emoji_created", "emoji_create"),
    ("emoji_deleted", "emoji_delete"),
    ("category_created", "category_create"),
    ("category_updated", "category_update"),
    ("category_deleted", "category_delete"),
    ("mention", "mention"),
    // voice events
    ("voice_participant_joined", "voice_join"),
    ("voice_participant_left", "voice_leave"),
    ("voice_state_update", "voice_state_update"),
    // DM events
    ("dm_new_message", "dm_message"),
    ("dm_message_edited", "dm_message_edit"),
    ("dm_message_deleted", "dm_message_delete"),
    ("dm_typing", "dm_typing"),
    ("dm_conversation_created", "dm_conversation_create"),
];

/// Normalize a wire type into a handler key.
///
/// Unmapped types are returned unchanged.
#[must_use]
pub fn handler_key(wire_type: &str) -> &str {
    EVENT_MAP
        .iter()
        .find(|(wire, _)| *wire == wire_type)
        .map_or(wire_type, |(_, key)| *key)
}

/// An inbound event after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new channel or DM message.
    Message(Message),
    /// A user joined a space.
    MemberJoin(User),
    /// A channel was created or updated.
    Channel(Channel),
    /// A role was created or updated.
    Role(Role),
    /// A category was created or updated.
    Category(ChannelCategory),
    /// Any event without a typed record, payload untouched.
    Raw(Value),
}

impl Event {
    /// The message, if this is a message event.
    #[must_use]
    pub const fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// The raw payload, if the event was not parsed into a record.
    #[must_use]
    pub const fn as_raw(&self) -> Option<&Value> {
        match self {
            Self::Raw(value) => Some(value),
            _ => None,
        }
    }
}

/// Convert a raw event payload into a typed [`Event`].
///
/// Payloads of known types that do not fit their record come back as
/// [`Event::Raw`].
#[must_use]
pub fn parse_event(wire_type: &str, payload: Value) -> Event {
    let parsed = match wire_type {
        "new_message" | "dm_new_message" => {
            Message::from_value(payload.clone()).map(Event::Message)
        }
        "member_joined" => {
            let user = payload
                .get("user")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            User::from_value(user).map(Event::MemberJoin)
        }
        "channel_created" | "channel_updated" => {
            Channel::from_value(scoped_record(&payload, "channel")).map(Event::Channel)
        }
        "role_created" | "role_updated" => {
            Role::from_value(scoped_record(&payload, "role")).map(Event::Role)
        }
        "category_created" | "category_updated" => {
            ChannelCategory::from_value(scoped_record(&payload, "category")).map(Event::Category)
        }
        // Edits and deletes are partial updates without a full record.
        _ => return Event::Raw(payload),
    };

    parsed.unwrap_or_else(|e: ProtoError| {
        debug!(event = wire_type, error = %e, "event payload did not match its record");
        Event::Raw(payload)
    })
}

/// Take the record nested under `field` (or the payload itself) and fill in
/// `space_id` from the top level when the record lacks one.
fn scoped_record(payload: &Value, field: &str) -> Value {
    let space_id = payload
        .get("space_id")
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()));

    let mut record = payload.get(field).unwrap_or(payload).clone();
    if let Value::Object(map) = &mut record {
        map.entry("space_id").or_insert(space_id);
    }
    record
}
