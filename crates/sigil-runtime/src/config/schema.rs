//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sigil_core::Snowflake;
use sigil_framework::result::DEFAULT_INTERNAL_ERROR;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SigilConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const NAMES: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact otherwise.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// When the log file is rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-target levels, e.g. `sigil_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            filters: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Command framework configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Users allowed to run developer-only commands.
    #[serde(default)]
    pub developers: Vec<Snowflake>,

    /// Emit the framework's per-step trace lines.
    #[serde(default)]
    pub enable_internal_trace: bool,

    /// Delete platform commands that no definition resolved to.
    #[serde(default)]
    pub delete_orphaned: bool,

    /// Guilds receiving the guild command set.
    #[serde(default)]
    pub guild_ids: Vec<Snowflake>,

    /// Locale used when neither the interaction nor the guild has one.
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// How often expired cooldowns are swept, in seconds.
    #[serde(default = "default_cooldown_cleanup_secs")]
    pub cooldown_cleanup_secs: u64,

    #[serde(default)]
    pub messages: MessagesConfig,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            developers: Vec::new(),
            enable_internal_trace: false,
            delete_orphaned: false,
            guild_ids: Vec::new(),
            default_locale: default_locale(),
            cooldown_cleanup_secs: default_cooldown_cleanup_secs(),
            messages: MessagesConfig::default(),
        }
    }
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_cooldown_cleanup_secs() -> u64 {
    60
}

/// User-facing message templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Sent when a command fails. `{id}` is replaced by the diagnostic id.
    #[serde(default = "default_internal_error")]
    pub internal_error: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            internal_error: default_internal_error(),
        }
    }
}

fn default_internal_error() -> String {
    DEFAULT_INTERNAL_ERROR.to_string()
}
