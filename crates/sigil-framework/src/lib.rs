//! # Sigil Framework
//!
//! The command resolution and dispatch pipeline.
//!
//! This layer provides:
//! - Command definitions with slash, user and message builds and sub-commands
//! - An immutable resolved index, swapped in atomically after each sync
//! - The dispatch pipeline: resolver, precondition gate, context builder,
//!   middleware chain, executor and result handler
//! - Autocomplete dispatch over the same resolver
//! - Command synchronisation against the platform
//!
//! Every dispatch ends in exactly one of: a silent skip, a logged success, or
//! a logged failure with a single user notification carrying a diagnostic id.

pub mod command;
pub mod context;
pub mod cooldown;
pub mod error;
pub mod executor;
pub mod locale;
pub mod manager;
pub mod middleware;
pub mod precondition;
pub mod registry;
pub mod resolver;
pub mod result;
pub mod sync;

#[cfg(test)]
mod testing;

pub use command::{
    Command, CommandBuild, CommandHandler, CommandOptions, DispatchResult, OptionParser,
    ParsedOptions, SchemaOptionParser, SlashBuild, SubCommandContainer, SubCommandGroup, Success,
    command_display,
};
pub use context::{
    AutocompleteContext, CommandContext, ContextKind, ContextVariant, GuildInfo, Scope,
};
pub use cooldown::{CooldownConfig, CooldownManager};
pub use error::{ResolveError, ResolveResult};
pub use locale::{DefaultLocaleDetector, IdentityTranslator, LocaleDetector, Translator};
pub use manager::{CommandManager, CommandManagerBuilder, DispatchOutcome};
pub use middleware::{Middleware, MiddlewareOutcome, middleware_fn};
pub use precondition::{Precondition, PreconditionRequest};
pub use registry::{CommandRegistry, ResolvedCommandIndex};
pub use resolver::ResolvedCommand;
pub use result::{DefaultResultHandler, MessageTemplates, ResultHandler, ResultInfo};
pub use sync::{SyncPlan, SyncReport};
