//! Sigil Runtime - orchestration layer for the Sigil command framework.
//!
//! This crate provides:
//! - Layered configuration (`SigilConfig`, `ConfigLoader`)
//! - Logging setup driven by that configuration
//! - The runtime (`SigilRuntime`) that syncs commands and feeds
//!   interactions from a channel into the dispatch pipeline
//!
//! ```ignore
//! use sigil_runtime::SigilRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = SigilRuntime::new();
//!     runtime.register_command(ping()).await;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(256);
//!     gateway.forward_interactions(tx);
//!
//!     runtime.run(platform, rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    CommandsConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, Profile, SigilConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, SigilRuntime};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for command code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
