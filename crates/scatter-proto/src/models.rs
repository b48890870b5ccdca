//! Typed records that known gateway events are parsed into.
//!
//! Only `id` is mandatory; every other field falls back to a default so that
//! partial payloads still parse. Explicit `null`s count as absent, and
//! timestamps that cannot be read become `None` instead of failing the record.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProtoError;
use crate::types::{ChannelType, Permission, PresenceStatus};

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ProtoError> {
    serde_json::from_value(value).map_err(|e| ProtoError::Decoding(e.to_string()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS[.f]` (read as UTC) and unix
/// seconds. Anything else is `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => parse_timestamp(&text),
        Value::Number(secs) => secs.as_i64().and_then(|s| DateTime::from_timestamp(s, 0)),
        _ => None,
    })
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// A Scatter user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// User ID.
    pub id: String,
    /// Unique username.
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Whether the account is a bot.
    #[serde(default, deserialize_with = "null_as_default")]
    pub bot: bool,
    /// Last known presence.
    #[serde(default)]
    pub status: Option<PresenceStatus>,
}

impl User {
    /// Parse from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not describe a user.
    pub fn from_value(value: Value) -> Result<Self, ProtoError> {
        from_value(value)
    }

    /// Display name if set, username otherwise.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

/// A message in a channel or DM conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Message ID.
    pub id: String,
    /// Channel (or DM conversation) the message was posted in.
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel_id: String,
    /// Space the channel belongs to; absent for DMs.
    #[serde(default)]
    pub space_id: Option<String>,
    /// Text content.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Author.
    pub author: User,
    /// ID of the message this one replies to.
    #[serde(default)]
    pub reply_to: Option<String>,
    /// Whether the message is pinned.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pinned: bool,
    /// Creation time.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last edit time.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub edited_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Parse from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not describe a message.
    pub fn from_value(value: Value) -> Result<Self, ProtoError> {
        from_value(value)
    }

    /// Whether the message was sent in a direct-message conversation.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.space_id.is_none()
    }
}

/// A channel inside a space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Channel ID.
    pub id: String,
    /// Owning space.
    #[serde(default, deserialize_with = "null_as_default")]
    pub space_id: String,
    /// Channel name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Text or voice.
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel_type: ChannelType,
    /// Sort position.
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: i64,
    /// Topic line.
    #[serde(default)]
    pub topic: Option<String>,
    /// Category the channel is grouped under.
    #[serde(default)]
    pub category_id: Option<String>,
}

impl Channel {
    /// Parse from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not describe a channel.
    pub fn from_value(value: Value) -> Result<Self, ProtoError> {
        from_value(value)
    }
}

/// A channel category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelCategory {
    /// Category ID.
    pub id: String,
    /// Owning space.
    #[serde(default, deserialize_with = "null_as_default")]
    pub space_id: String,
    /// Category name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Sort position.
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: i64,
}

impl ChannelCategory {
    /// Parse from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not describe a category.
    pub fn from_value(value: Value) -> Result<Self, ProtoError> {
        from_value(value)
    }
}

/// A role inside a space.
///
/// Permissions stay as wire strings so that permissions added server-side do
/// not break parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Role ID.
    pub id: String,
    /// Owning space.
    #[serde(default, deserialize_with = "null_as_default")]
    pub space_id: String,
    /// Role name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Display color, e.g. `#ff8800`.
    #[serde(default)]
    pub color: Option<String>,
    /// Sort position.
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: i64,
    /// Granted permissions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub permissions: Vec<String>,
}

impl Role {
    /// Parse from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not describe a role.
    pub fn from_value(value: Value) -> Result<Self, ProtoError> {
        from_value(value)
    }

    /// Check whether the role grants a permission.
    #[must_use]
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.iter().any(|p| p == permission.as_str())
    }
}
