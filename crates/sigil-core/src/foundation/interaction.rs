//! The raw inbound interaction.

use serde::{Deserialize, Serialize};

use super::command::{ApplicationCommand, CommandType};
use super::entity::{Member, Message, Snowflake, User};
use super::permissions::Permissions;

/// What the interaction asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Direct command invocation of the given build kind.
    Command(CommandType),
    /// Autocomplete suggestions for a slash-command option.
    Autocomplete,
}

/// A raw option value, as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(Snowflake),
    Channel(Snowflake),
    Role(Snowflake),
    Mentionable(Snowflake),
    Attachment(Snowflake),
}

impl OptionValue {
    /// The value as JSON, used for choice comparison.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => s.clone().into(),
            Self::Integer(i) => (*i).into(),
            Self::Number(n) => (*n).into(),
            Self::Boolean(b) => (*b).into(),
            Self::User(id)
            | Self::Channel(id)
            | Self::Role(id)
            | Self::Mentionable(id)
            | Self::Attachment(id) => id.to_string().into(),
        }
    }
}

/// A named option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOption {
    pub name: String,
    pub value: OptionValue,
}

impl RawOption {
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// What a context-menu command was invoked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionTarget {
    User {
        user: User,
        #[serde(default)]
        member: Option<Member>,
    },
    Message(Message),
}

/// An inbound interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub kind: InteractionKind,
    /// The platform-side command descriptor, if the platform attached one.
    #[serde(default)]
    pub command: Option<ApplicationCommand>,
    pub command_name: String,
    pub user: User,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    /// Whether the application is installed in the guild the interaction
    /// comes from (as opposed to a user-installed app used in a guild).
    #[serde(default)]
    pub guild_installed: bool,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub guild_locale: Option<String>,
    /// Permissions of the application in the invoking channel.
    #[serde(default)]
    pub app_permissions: Option<Permissions>,
    #[serde(default)]
    pub subcommand_group: Option<String>,
    #[serde(default)]
    pub subcommand: Option<String>,
    #[serde(default)]
    pub options: Vec<RawOption>,
    /// Name of the focused option (autocomplete only).
    #[serde(default)]
    pub focused: Option<String>,
    #[serde(default)]
    pub target: Option<InteractionTarget>,
}

impl Interaction {
    pub fn is_command(&self) -> bool {
        matches!(self.kind, InteractionKind::Command(_))
    }

    pub fn is_autocomplete(&self) -> bool {
        matches!(self.kind, InteractionKind::Autocomplete)
    }

    /// Returns `true` for interactions from a guild where the app is installed.
    pub fn is_guild(&self) -> bool {
        self.guild_id.is_some() && self.guild_installed
    }

    /// Looks up a raw option by name.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|opt| opt.name == name)
            .map(|opt| &opt.value)
    }

    /// Value of the focused option, as a string.
    pub fn focused_value(&self) -> Option<String> {
        let focused = self.focused.as_deref()?;
        self.option(focused).map(|value| match value {
            OptionValue::String(s) => s.clone(),
            other => other.to_json().to_string(),
        })
    }
}

/// An outgoing reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub content: String,
    #[serde(default)]
    pub ephemeral: bool,
}

impl ReplyPayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// A suggestion returned by an autocomplete handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteChoice {
    pub name: String,
    pub value: serde_json::Value,
}

impl AutocompleteChoice {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction() -> Interaction {
        Interaction {
            id: 1,
            kind: InteractionKind::Autocomplete,
            command: None,
            command_name: "search".into(),
            user: User::new(7, "alice"),
            guild_id: Some(10),
            channel_id: Some(20),
            guild_installed: false,
            locale: None,
            guild_locale: None,
            app_permissions: None,
            subcommand_group: None,
            subcommand: None,
            options: vec![
                RawOption::new("query", OptionValue::String("ru".into())),
                RawOption::new("limit", OptionValue::Integer(5)),
            ],
            focused: Some("query".into()),
            target: None,
        }
    }

    #[test]
    fn test_guild_requires_install() {
        let mut i = interaction();
        assert!(!i.is_guild());
        i.guild_installed = true;
        assert!(i.is_guild());
        i.guild_id = None;
        assert!(!i.is_guild());
    }

    #[test]
    fn test_focused_value() {
        let mut i = interaction();
        assert_eq!(i.focused_value().as_deref(), Some("ru"));
        i.focused = Some("limit".into());
        assert_eq!(i.focused_value().as_deref(), Some("5"));
        i.focused = None;
        assert_eq!(i.focused_value(), None);
    }

    #[test]
    fn test_deserialize_minimal() {
        let json = serde_json::json!({
            "id": 5,
            "kind": { "command": "chat_input" },
            "command_name": "ping",
            "user": { "id": 1, "name": "bob" }
        });
        let i: Interaction = serde_json::from_value(json).unwrap();
        assert_eq!(i.kind, InteractionKind::Command(CommandType::ChatInput));
        assert!(i.command.is_none());
        assert!(i.options.is_empty());
    }
}
