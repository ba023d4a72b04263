//! # Sigil
//!
//! Command resolution and dispatch for chat-platform applications.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐   ┌─────────┐   ┌────────────┐   ┌──────────┐
//! │ Platform │──▶│ Resolver │──▶│ Precondition │──▶│ Context │──▶│ Middleware │──▶│ Executor │
//! │  (SDK)   │   │  (index) │   │     gate     │   │ builder │   │   chain    │   │          │
//! └──────────┘   └──────────┘   └──────────────┘   └─────────┘   └────────────┘   └────┬─────┘
//!                                                                                      ▼
//!                                                                             Result handler
//! ```
//!
//! - **Runtime**: loads configuration, syncs commands and feeds interactions
//!   into the pipeline
//! - **Registry**: the resolved index built by sync, swapped in atomically
//! - **Preconditions**: developer-only, app permissions, custom checks and cooldowns
//! - **Middleware**: ordered pre-handler steps that may cancel the invocation
//! - **Result handler**: the only component that notifies the user of a failure
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sigil::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = SigilRuntime::new();
//!     runtime
//!         .register_command(CommandHandler::new(
//!             SlashBuild::new("ping", "Replies with pong"),
//!             |ctx| async move {
//!                 ctx.reply("pong").await?;
//!                 ctx.ok()
//!             },
//!         ))
//!         .await;
//!
//!     runtime.run(platform, interactions).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use sigil_core as core;
pub use sigil_framework as framework;
pub use sigil_runtime as runtime;

/// Commonly used types for building commands.
///
/// ```rust,ignore
/// use sigil::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use sigil_runtime::{SigilConfig, SigilRuntime};

    // Command definitions
    pub use sigil_framework::{
        Command, CommandBuild, CommandHandler, CommandOptions, DispatchResult, SlashBuild,
        SubCommandContainer, SubCommandGroup, Success,
    };

    // Invocation contexts
    pub use sigil_framework::{AutocompleteContext, CommandContext, Scope};

    // Pipeline extension points
    pub use sigil_framework::{
        CooldownConfig, Middleware, MiddlewareOutcome, Precondition, PreconditionRequest,
        ResultHandler, middleware_fn,
    };

    // Platform model
    pub use sigil_core::{
        AutocompleteChoice, BoxedPlatform, DiagnosticError, ErrorKind, Interaction, OptionKind,
        OptionSpec, Permissions, Platform, ReplyPayload,
    };

    pub use sigil_runtime::prelude::*;
}
