//! Errors raised by the platform surface.
//!
//! Pipeline-level failures are expressed with
//! [`DiagnosticError`](super::diagnostic::DiagnosticError); this module only
//! covers what a [`Platform`](crate::Platform) call itself can report.

use thiserror::Error;

// =============================================================================
// Platform API Errors
// =============================================================================

/// Errors that can occur while calling the chat platform.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The requested entity does not exist or is not visible to the application.
    #[error("unknown {resource}: {id}")]
    NotFound {
        /// Resource kind, e.g. `"guild"`.
        resource: &'static str,
        /// The id that was looked up.
        id: u64,
    },

    /// The platform refused the call.
    #[error("platform error ({code}): {message}")]
    Rejected {
        /// Platform-specific error code.
        code: i32,
        /// Message returned by the platform.
        message: String,
    },

    /// The interaction token is no longer valid for a reply.
    #[error("interaction already acknowledged or expired")]
    InteractionExpired,

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates a not-found error for a resource.
    pub fn not_found(resource: &'static str, id: u64) -> Self {
        Self::NotFound { resource, id }
    }

    /// Creates a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for platform calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ApiError::not_found("channel", 42).to_string(),
            "unknown channel: 42"
        );
        assert_eq!(
            ApiError::Rejected {
                code: 50013,
                message: "Missing Permissions".into()
            }
            .to_string(),
            "platform error (50013): Missing Permissions"
        );
        assert_eq!(ApiError::other("boom").to_string(), "boom");
    }
}
