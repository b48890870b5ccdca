//! Enumerations shared by model records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user's presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Online.
    Online,
    /// Idle.
    Idle,
    /// Do not disturb.
    Dnd,
    /// Offline.
    #[default]
    Offline,
    /// Online but shown as offline.
    Invisible,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
            Self::Invisible => "invisible",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Kind of channel within a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Text channel.
    #[default]
    Text,
    /// Voice channel.
    Voice,
    /// A channel kind this client does not know about.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Voice => write!(f, "voice"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A permission a role can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Send messages.
    SendMessages,
    /// Attach files.
    AttachFiles,
    /// Embed links.
    EmbedLinks,
    /// Manage messages.
    ManageMessages,
    /// Manage channels.
    ManageChannels,
    /// Kick members.
    KickMembers,
    /// Manage roles.
    ManageRoles,
    /// Manage the space.
    ManageSpace,
    /// Mention everyone.
    MentionEveryone,
    /// Pin messages.
    PinMessages,
    /// Create invites.
    CreateInvites,
    /// Manage invites.
    ManageInvites,
}

impl Permission {
    /// Wire name of the permission.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessages => "send_messages",
            Self::AttachFiles => "attach_files",
            Self::EmbedLinks => "embed_links",
            Self::ManageMessages => "manage_messages",
            Self::ManageChannels => "manage_channels",
            Self::KickMembers => "kick_members",
            Self::ManageRoles => "manage_roles",
            Self::ManageSpace => "manage_space",
            Self::MentionEveryone => "mention_everyone",
            Self::PinMessages => "pin_messages",
            Self::CreateInvites => "create_invites",
            Self::ManageInvites => "manage_invites",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
