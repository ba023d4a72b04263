//! Snapshots of platform entities.
//!
//! These are the values returned by [`Platform`](crate::Platform) fetches.
//! They carry only what the dispatch pipeline reads; a binding is free to
//! keep richer types on its own side.

use serde::{Deserialize, Serialize};

use super::permissions::Permissions;

/// Platform-assigned identifier.
pub type Snowflake = u64;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }
}

/// A guild (server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    pub owner_id: Snowflake,
}

/// A user's membership in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Member {
    /// Returns the nickname, falling back to the user name.
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.name)
    }
}

/// Kind of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Voice,
    Thread,
    Announcement,
    Forum,
    Direct,
}

/// A channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    pub name: String,
    pub kind: ChannelKind,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// A message, as seen by message-context commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub author: User,
    #[serde(default)]
    pub content: String,
}
