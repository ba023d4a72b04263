//! The diagnostic error carried by every failed dispatch.
//!
//! A [`DiagnosticError`] bundles a human message, a structured debug payload,
//! the original cause and a correlation id. The id is generated lazily and
//! only once, so the value written to the logs is the same value embedded in
//! the message shown to the user.

use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

// =============================================================================
// Error Kinds
// =============================================================================

/// Why command resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveFailure {
    /// The interaction carries no platform command reference.
    MissingCommandRef,
    /// No registered command (or sub-command) matches.
    NotFound,
    /// The interaction does not have the shape the command expects.
    InvalidShape,
}

impl ResolveFailure {
    /// Short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCommandRef => "missing_command_ref",
            Self::NotFound => "not_found",
            Self::InvalidShape => "invalid_shape",
        }
    }
}

/// Which guild-context fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuildStep {
    Guild,
    Member,
    Channel,
    TargetMember,
}

impl GuildStep {
    /// The resource name, as it appears in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guild => "guild",
            Self::Member => "member",
            Self::Channel => "channel",
            Self::TargetMember => "target member",
        }
    }
}

/// Category of a [`DiagnosticError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The interaction could not be matched to a command.
    Resolution(ResolveFailure),
    /// A precondition check failed hard (not a soft skip).
    Precondition,
    /// Fetching guild, member, channel or target member failed.
    GuildResolution(GuildStep),
    /// Building the invocation context failed (option parsing, pre-reply, ...).
    Context,
    /// A middleware failed or panicked.
    Middleware {
        /// Name of the offending middleware.
        name: String,
    },
    /// The command handler failed or panicked.
    Handler,
    /// Sending a reply failed.
    Delivery,
    /// Pushing or fetching commands on the platform failed.
    Sync,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(failure) => write!(f, "resolution/{}", failure.as_str()),
            Self::Precondition => f.write_str("precondition"),
            Self::GuildResolution(step) => write!(f, "guild_resolution/{}", step.as_str()),
            Self::Context => f.write_str("context"),
            Self::Middleware { name } => write!(f, "middleware/{name}"),
            Self::Handler => f.write_str("handler"),
            Self::Delivery => f.write_str("delivery"),
            Self::Sync => f.write_str("sync"),
            Self::Internal => f.write_str("internal"),
        }
    }
}

// =============================================================================
// DiagnosticError
// =============================================================================

/// The error shape shared by every stage of the dispatch pipeline.
///
/// Cloning is cheap apart from the debug map; the original cause is shared.
#[derive(Debug, Clone)]
pub struct DiagnosticError {
    kind: ErrorKind,
    message: String,
    debugs: Map<String, Value>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
    id: OnceLock<String>,
}

impl DiagnosticError {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            debugs: Map::new(),
            cause: None,
            id: OnceLock::new(),
        }
    }

    /// Creates a handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Handler, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Creates a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Precondition, message)
    }

    /// Creates a context-construction error.
    pub fn context(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Context, message)
    }

    /// Creates an error attributed to a middleware.
    pub fn middleware(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Middleware { name: name.into() }, message)
    }

    /// Creates the error for a failed guild-context fetch.
    ///
    /// The message always names the failing resource.
    pub fn guild_fetch(step: GuildStep, cause: impl StdError + Send + Sync + 'static) -> Self {
        let message = format!("failed to get {} because {cause}", step.as_str());
        Self::new(ErrorKind::GuildResolution(step), message).with_cause(cause)
    }

    /// Attaches a structured debug value.
    pub fn with_debug(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.debugs.insert(key.into(), value.into());
        self
    }

    /// Attaches the original cause.
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Attaches an already shared cause.
    pub fn with_shared_cause(mut self, cause: Arc<dyn StdError + Send + Sync>) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Re-tags the error with another kind, keeping everything else.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the human message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the structured debug payload.
    pub fn debugs(&self) -> &Map<String, Value> {
        &self.debugs
    }

    /// Returns the original cause, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync)> {
        self.cause.as_deref()
    }

    /// Returns the diagnostic id if one was generated.
    pub fn id(&self) -> Option<&str> {
        self.id.get().map(String::as_str)
    }

    /// Returns the diagnostic id, generating it on first call.
    ///
    /// Every later call (including through clones made afterwards) returns
    /// the same value.
    pub fn generate_id(&self) -> &str {
        self.id.get_or_init(|| uuid::Uuid::new_v4().to_string())
    }

    /// Renders the debug payload as a compact JSON string for logging.
    pub fn debugs_json(&self) -> String {
        Value::Object(self.debugs.clone()).to_string()
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id.get() {
            Some(id) => write!(f, "[{}] {} ({id})", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl StdError for DiagnosticError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl From<crate::ApiError> for DiagnosticError {
    fn from(err: crate::ApiError) -> Self {
        Self::internal(err.to_string()).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiError;

    #[test]
    fn test_generate_id_is_idempotent() {
        let err = DiagnosticError::handler("boom");
        assert!(err.id().is_none());

        let first = err.generate_id().to_string();
        assert_eq!(err.generate_id(), first);
        assert_eq!(err.id(), Some(first.as_str()));

        let cloned = err.clone();
        assert_eq!(cloned.generate_id(), first);
    }

    #[test]
    fn test_distinct_errors_get_distinct_ids() {
        let a = DiagnosticError::internal("a");
        let b = DiagnosticError::internal("a");
        assert_ne!(a.generate_id(), b.generate_id());
    }

    #[test]
    fn test_guild_fetch_names_resource() {
        let err = DiagnosticError::guild_fetch(GuildStep::Channel, ApiError::other("timeout"));
        assert_eq!(err.kind(), &ErrorKind::GuildResolution(GuildStep::Channel));
        assert!(err.message().contains("channel"));
        assert!(err.cause().is_some());
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn test_debugs_and_display() {
        let err = DiagnosticError::middleware("auth", "stopped")
            .with_debug("command", "ping")
            .with_debug("attempt", 2);

        assert_eq!(err.debugs().get("attempt"), Some(&Value::from(2)));
        assert!(err.debugs_json().contains("\"command\":\"ping\""));
        assert_eq!(err.to_string(), "[middleware/auth] stopped");

        let id = err.generate_id().to_string();
        assert!(err.to_string().ends_with(&format!("({id})")));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            ErrorKind::Resolution(ResolveFailure::InvalidShape).to_string(),
            "resolution/invalid_shape"
        );
        assert_eq!(
            ErrorKind::GuildResolution(GuildStep::TargetMember).to_string(),
            "guild_resolution/target member"
        );
    }
}
