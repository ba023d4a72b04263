//! Runtime error types.

use sigil_core::DiagnosticError;
use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Publishing commands to the platform failed.
    #[error("Command sync failed: {0}")]
    Sync(#[from] DiagnosticError),

    /// The runtime has no command manager yet.
    #[error("Runtime not started")]
    NotStarted,

    /// `start` was called twice.
    #[error("Runtime already running")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
