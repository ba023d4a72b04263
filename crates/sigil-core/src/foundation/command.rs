//! Command descriptors.
//!
//! Two directions are modelled here:
//! - [`CommandSpec`] is what the framework pushes to the platform.
//! - [`ApplicationCommand`] is what the platform reports back, carrying the
//!   platform-assigned id.

use serde::{Deserialize, Serialize};

use super::entity::Snowflake;

/// The build kind of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// Slash command.
    ChatInput,
    /// User context-menu command.
    User,
    /// Message context-menu command.
    Message,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatInput => "slash",
            Self::User => "user",
            Self::Message => "message",
        }
    }
}

/// A command as registered on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationCommand {
    /// Platform-assigned id.
    pub id: Snowflake,
    pub name: String,
    pub kind: CommandType,
    /// Set for guild-scoped commands.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// Where a command set is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandScope {
    Global,
    Guild(Snowflake),
}

impl CommandScope {
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::Global => None,
            Self::Guild(id) => Some(*id),
        }
    }
}

// =============================================================================
// Specs pushed to the platform
// =============================================================================

/// Type of a slash-command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
}

/// A predefined choice for an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: serde_json::Value,
}

/// A slash-command option declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    #[serde(default)]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl OptionSpec {
    /// Creates an optional option of the given kind.
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            choices: Vec::new(),
            autocomplete: false,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }
}

/// A sub-command inside a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCommandSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub options: Vec<OptionSpec>,
}

/// A sub-command group inside a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCommandGroupSpec {
    pub name: String,
    pub description: String,
    pub sub_commands: Vec<SubCommandSpec>,
}

/// One platform command, as pushed by a sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub kind: CommandType,
    pub name: String,
    /// Empty for context-menu commands.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<OptionSpec>,
    #[serde(default)]
    pub sub_commands: Vec<SubCommandSpec>,
    #[serde(default)]
    pub groups: Vec<SubCommandGroupSpec>,
}
