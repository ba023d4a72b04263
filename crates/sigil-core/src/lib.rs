//! # Sigil Core
//!
//! The platform model underneath the Sigil command framework.
//!
//! Sigil does not talk to a chat platform itself. It consumes an opaque SDK
//! through the [`Platform`] trait and routes the interactions that SDK
//! delivers. This crate holds everything both sides agree on.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Plain data and the error vocabulary:
//! - **Entities**: [`User`], [`Guild`], [`Member`], [`Channel`], [`Message`]
//! - **Permissions**: the [`Permissions`] bit set
//! - **Commands**: platform descriptors ([`ApplicationCommand`]) and the specs
//!   pushed to the platform ([`CommandSpec`])
//! - **Interactions**: the raw inbound value ([`Interaction`])
//! - **Diagnostics**: [`DiagnosticError`] with an idempotent correlation id
//!
//! ### Integration Layer
//!
//! The collaborator surface implemented by a platform SDK binding:
//! - **Platform**: fetch, reply and command-registration primitives ([`Platform`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use sigil_core::{DiagnosticError, ErrorKind};
//!
//! let err = DiagnosticError::new(ErrorKind::Handler, "database unreachable")
//!     .with_debug("table", "users");
//!
//! let id = err.generate_id().to_string();
//! assert_eq!(err.generate_id(), id);
//! ```

// Architectural layers
pub mod foundation;
pub mod integration;

// Re-export foundation types
pub use foundation::{
    ApiError, ApiResult, ApplicationCommand, AutocompleteChoice, Channel, ChannelKind,
    CommandScope, CommandSpec, CommandType, DiagnosticError, ErrorKind, Guild, GuildStep,
    Interaction, InteractionKind, InteractionTarget, Member, Message, OptionChoice, OptionKind,
    OptionSpec, OptionValue, Permissions, RawOption, ReplyPayload, ResolveFailure, Snowflake,
    SubCommandGroupSpec, SubCommandSpec, User,
};

// Re-export integration types
pub use integration::{BoxedPlatform, Platform};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::{BoxedPlatform, Platform};
}
