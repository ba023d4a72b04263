//! Maps an inbound interaction to a registered command.

use std::sync::Arc;

use sigil_core::{CommandType, Interaction, InteractionKind};

use crate::command::{Command, CommandHandler};
use crate::error::{ResolveError, ResolveResult};
use crate::registry::{ResolvedCommandIndex, api_command_key};

/// The outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedCommand {
    /// The handler to run. For sub-command containers this is the sub-command.
    pub command: Arc<CommandHandler>,
    /// The registry key the interaction resolved through.
    pub resolved_key: String,
}

/// Resolves an interaction against an index snapshot.
///
/// Sub-command lookup is by exact name. A group name, when present, must name
/// an existing group.
pub fn resolve(index: &ResolvedCommandIndex, interaction: &Interaction) -> ResolveResult<ResolvedCommand> {
    let api_command = interaction
        .command
        .as_ref()
        .ok_or(ResolveError::MissingCommandRef)?;
    let resolved_key = api_command_key(api_command);

    let command = match index.get(&resolved_key) {
        Some(Command::Handler(handler)) => Arc::clone(handler),
        Some(Command::SubCommands(container)) => {
            if !matches!(
                interaction.kind,
                InteractionKind::Command(CommandType::ChatInput) | InteractionKind::Autocomplete
            ) {
                return Err(ResolveError::invalid_shape(format!(
                    "'{}' only accepts slash invocations",
                    container.name()
                )));
            }

            let sub = interaction.subcommand.as_deref().ok_or_else(|| {
                ResolveError::invalid_shape(format!(
                    "'{}' requires a sub-command name",
                    container.name()
                ))
            })?;

            let found = match interaction.subcommand_group.as_deref() {
                Some(group) => container
                    .get_group(group)
                    .ok_or_else(|| ResolveError::not_found(format!("{resolved_key} {group}")))?
                    .find(sub),
                None => container.find(sub),
            };

            let path = match interaction.subcommand_group.as_deref() {
                Some(group) => format!("{resolved_key} {group} {sub}"),
                None => format!("{resolved_key} {sub}"),
            };
            Arc::clone(found.ok_or_else(|| ResolveError::not_found(path))?)
        }
        None => return Err(ResolveError::not_found(resolved_key)),
    };

    Ok(ResolvedCommand {
        command,
        resolved_key,
    })
}
