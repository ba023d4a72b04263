//! Command definitions.
//!
//! A command is either a plain [`CommandHandler`] or a
//! [`SubCommandContainer`] grouping several handlers under one slash name.
//! Definitions are built once at start-up and never mutated afterwards; they
//! are shared by `Arc` between the registry and every dispatch.
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil_framework::command::{Command, CommandHandler, SlashBuild};
//!
//! let ping = CommandHandler::new(SlashBuild::new("ping", "Replies with pong"), |ctx| async move {
//!     ctx.reply("pong").await?;
//!     ctx.ok()
//! });
//!
//! let command: Command = ping.into();
//! ```

pub mod definition;
pub mod options;

use sigil_core::{CommandType, Interaction, InteractionKind};

pub use definition::{
    AutocompleteFn, BoxFuture, Command, CommandBuild, CommandHandler, CommandOptions,
    ContextMenuBuild, DispatchResult, RunFn, SlashBuild, SubCommandContainer, SubCommandGroup,
    Success,
};
pub use options::{OptionError, OptionParser, ParsedOptions, SchemaOptionParser};

/// Renders the invoked command for logs.
///
/// Slash invocations render as `/name group sub`; context-menu invocations
/// render as the bare command name.
pub fn command_display(interaction: &Interaction) -> String {
    match interaction.kind {
        InteractionKind::Command(CommandType::User | CommandType::Message) => {
            interaction.command_name.clone()
        }
        InteractionKind::Command(CommandType::ChatInput) | InteractionKind::Autocomplete => {
            let mut display = format!("/{}", interaction.command_name);
            for part in [&interaction.subcommand_group, &interaction.subcommand]
                .into_iter()
                .flatten()
            {
                display.push(' ');
                display.push_str(part);
            }
            display
        }
    }
}
