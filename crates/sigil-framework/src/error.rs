//! Error types for the Sigil framework.
//!
//! Every failure of a dispatch ends up as a
//! [`DiagnosticError`](sigil_core::DiagnosticError). The enums here describe
//! failures of individual stages and convert into that shape.

use sigil_core::{DiagnosticError, ErrorKind, ResolveFailure};
use thiserror::Error;

/// Errors produced by the command resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The interaction carries no platform command reference.
    #[error("interaction carries no platform command reference")]
    MissingCommandRef,

    /// Nothing is registered under the computed key.
    #[error("no command registered for '{key}'")]
    NotFound {
        /// The key (or sub-command path) that was looked up.
        key: String,
    },

    /// The interaction does not match the shape of the registered command.
    #[error("invalid interaction shape: {reason}")]
    InvalidShape {
        /// What was wrong.
        reason: String,
    },
}

impl ResolveError {
    /// Creates a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an invalid-shape error.
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// The matching diagnostic category.
    pub fn failure(&self) -> ResolveFailure {
        match self {
            Self::MissingCommandRef => ResolveFailure::MissingCommandRef,
            Self::NotFound { .. } => ResolveFailure::NotFound,
            Self::InvalidShape { .. } => ResolveFailure::InvalidShape,
        }
    }
}

impl From<ResolveError> for DiagnosticError {
    fn from(err: ResolveError) -> Self {
        let diagnostic = DiagnosticError::new(ErrorKind::Resolution(err.failure()), err.to_string());
        match &err {
            ResolveError::NotFound { key } => diagnostic.with_debug("key", key.as_str()),
            _ => diagnostic,
        }
    }
}

/// Result type for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_diagnostic() {
        let err: DiagnosticError = ResolveError::not_found("1_ping").into();
        assert_eq!(
            err.kind(),
            &ErrorKind::Resolution(ResolveFailure::NotFound)
        );
        assert_eq!(err.debugs().get("key"), Some(&serde_json::Value::from("1_ping")));

        let err: DiagnosticError = ResolveError::invalid_shape("missing sub-command").into();
        assert_eq!(
            err.kind(),
            &ErrorKind::Resolution(ResolveFailure::InvalidShape)
        );
        assert!(err.message().contains("missing sub-command"));
    }
}
