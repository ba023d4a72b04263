//! Foundation layer - Plain data shared by the platform and the framework.
//!
//! This module contains the fundamental types of Sigil:
//! - Entity snapshots (users, guilds, members, channels, messages)
//! - The permission bit set
//! - Command descriptors and command specs
//! - The raw inbound interaction
//! - Error types, including the diagnostic error carried by every failed dispatch

pub mod command;
pub mod diagnostic;
pub mod entity;
pub mod error;
pub mod interaction;
pub mod permissions;

pub use command::{
    ApplicationCommand, CommandScope, CommandSpec, CommandType, OptionChoice, OptionKind,
    OptionSpec, SubCommandGroupSpec, SubCommandSpec,
};
pub use diagnostic::{DiagnosticError, ErrorKind, GuildStep, ResolveFailure};
pub use entity::{Channel, ChannelKind, Guild, Member, Message, Snowflake, User};
pub use error::{ApiError, ApiResult};
pub use interaction::{
    AutocompleteChoice, Interaction, InteractionKind, InteractionTarget, OptionValue, RawOption,
    ReplyPayload,
};
pub use permissions::Permissions;
