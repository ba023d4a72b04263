//! Command synchronisation.
//!
//! A sync turns the command definitions into platform command specs, pushes
//! them, matches the platform's answer back to the definitions and publishes
//! the resulting index:
//!
//! ```text
//! load_commands → push_commands → resolve_commands → publish → delete_orphaned
//! ```
//!
//! Resolved keys are always computed from the platform's command descriptors,
//! the same way the resolver computes them for an inbound interaction.

use sigil_core::{
    ApplicationCommand, CommandScope, CommandSpec, CommandType, DiagnosticError, ErrorKind,
    Platform, Snowflake, SubCommandGroupSpec, SubCommandSpec,
};
use tracing::{debug, error, info, warn};

use crate::command::{Command, CommandHandler, SubCommandContainer};
use crate::manager::CommandManager;
use crate::registry::{ResolvedCommandIndex, api_command_key};

/// What a sync should do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Guilds receiving the guild command set.
    pub guild_ids: Vec<Snowflake>,
    /// Delete platform commands that no definition resolved to.
    pub delete_orphaned: bool,
}

/// Summary of a finished sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries in the published index.
    pub registered: usize,
    /// Orphaned platform commands deleted.
    pub deleted: usize,
}

// ============================================================================
// Loading
// ============================================================================

fn sub_command_spec(handler: &CommandHandler) -> Option<SubCommandSpec> {
    let slash = handler.build().slash.as_ref()?;
    Some(SubCommandSpec {
        name: slash.name.clone(),
        description: slash.description.clone(),
        options: slash.options.clone().unwrap_or_default(),
    })
}

fn sub_command_specs(container: &str, handlers: &[std::sync::Arc<CommandHandler>]) -> Vec<SubCommandSpec> {
    handlers
        .iter()
        .filter_map(|handler| {
            let spec = sub_command_spec(handler);
            if spec.is_none() {
                error!(
                    container,
                    sub_command = handler.name(),
                    "Sub-command has no slash build, skipping"
                );
            }
            spec
        })
        .collect()
}

fn container_spec(container: &SubCommandContainer) -> CommandSpec {
    CommandSpec {
        kind: CommandType::ChatInput,
        name: container.name().to_string(),
        description: container.description().to_string(),
        options: Vec::new(),
        sub_commands: sub_command_specs(container.name(), container.sub_commands()),
        groups: container
            .groups()
            .map(|group| SubCommandGroupSpec {
                name: group.name().to_string(),
                description: group.description().to_string(),
                sub_commands: sub_command_specs(container.name(), group.sub_commands()),
            })
            .collect(),
    }
}

fn handler_specs(handler: &CommandHandler) -> Vec<CommandSpec> {
    let build = handler.build();
    let mut specs = Vec::new();

    if let Some(slash) = &build.slash {
        specs.push(CommandSpec {
            kind: CommandType::ChatInput,
            name: slash.name.clone(),
            description: slash.description.clone(),
            options: slash.options.clone().unwrap_or_default(),
            sub_commands: Vec::new(),
            groups: Vec::new(),
        });
    }
    for (kind, section) in [(CommandType::User, &build.user), (CommandType::Message, &build.message)] {
        if let Some(menu) = section {
            specs.push(CommandSpec {
                kind,
                name: menu.name.clone(),
                description: String::new(),
                options: Vec::new(),
                sub_commands: Vec::new(),
                groups: Vec::new(),
            });
        }
    }
    specs
}

/// Flattens every build section of `commands` into platform command specs.
///
/// Definitions without any build section are logged and skipped. `group`
/// names the command set in the summary line.
pub fn load_commands(commands: &[Command], group: &str) -> Vec<CommandSpec> {
    let mut specs = Vec::new();
    for command in commands {
        let loaded = match command {
            Command::Handler(handler) => handler_specs(handler),
            Command::SubCommands(container) => vec![container_spec(container)],
        };
        if loaded.is_empty() {
            error!(command = command.name(), group, "Command has no build section, skipping");
            continue;
        }
        specs.extend(loaded);
    }

    let count = |kind: CommandType| specs.iter().filter(|spec| spec.kind == kind).count();
    info!(
        group,
        slash = count(CommandType::ChatInput),
        message = count(CommandType::Message),
        user = count(CommandType::User),
        "Loaded {} {group} commands",
        specs.len()
    );
    specs
}

// ============================================================================
// Platform
// ============================================================================

fn sync_error(action: &str, scope: CommandScope, e: sigil_core::ApiError) -> DiagnosticError {
    let mut err = DiagnosticError::new(ErrorKind::Sync, format!("failed to {action}: {e}"));
    if let Some(guild_id) = scope.guild_id() {
        err = err.with_debug("guild_id", guild_id);
    }
    err.with_cause(e)
}

/// Replaces the command set of `scope` on the platform.
pub async fn push_commands(
    platform: &dyn Platform,
    scope: CommandScope,
    specs: Vec<CommandSpec>,
) -> Result<Vec<ApplicationCommand>, DiagnosticError> {
    let count = specs.len();
    let registered = platform
        .set_commands(scope, specs)
        .await
        .map_err(|e| sync_error("push commands", scope, e))?;
    debug!(?scope, pushed = count, registered = registered.len(), "Pushed commands");
    Ok(registered)
}

/// Matches every build section of `commands` to the platform command with the
/// same kind and name.
///
/// Sections the platform did not return are logged and left out.
pub fn resolve_commands(commands: &[Command], api_commands: &[ApplicationCommand]) -> ResolvedCommandIndex {
    let mut index = ResolvedCommandIndex::new();
    for command in commands {
        for (kind, name) in command.sections() {
            match api_commands
                .iter()
                .find(|api| api.kind == kind && api.name == name)
            {
                Some(api) => {
                    index.insert(api_command_key(api), command.clone());
                }
                None => warn!(
                    command = name,
                    kind = kind.as_str(),
                    "Command was not registered by the platform"
                ),
            }
        }
    }
    index
}

/// Deletes the platform commands of `scope` that are absent from `index`.
///
/// Returns the number of deleted commands. A failed deletion is logged and
/// not counted.
pub async fn delete_orphaned(
    platform: &dyn Platform,
    scope: CommandScope,
    index: &ResolvedCommandIndex,
) -> Result<usize, DiagnosticError> {
    let registered = platform
        .fetch_commands(scope)
        .await
        .map_err(|e| sync_error("fetch commands", scope, e))?;

    let mut deleted = 0;
    for command in registered {
        let key = api_command_key(&command);
        if index.contains(&key) {
            continue;
        }
        match platform.delete_command(scope, command.id).await {
            Ok(()) => {
                info!(command = %command.name, key = %key, "Deleted orphaned command");
                deleted += 1;
            }
            Err(e) => {
                error!(command = %command.name, key = %key, error = %e, "Failed to delete orphaned command");
            }
        }
    }
    Ok(deleted)
}

// ============================================================================
// Manager
// ============================================================================

impl CommandManager {
    /// Pushes the global and guild command sets and publishes the new index.
    ///
    /// The index is only published once every push succeeded; a failed sync
    /// leaves the previous snapshot in place.
    pub async fn sync(&self, plan: &SyncPlan) -> Result<SyncReport, DiagnosticError> {
        let inner = self.inner();
        let platform = inner.platform.as_ref();
        let mut index = ResolvedCommandIndex::new();
        let mut scopes = vec![CommandScope::Global];

        let specs = load_commands(&inner.commands, "global");
        let api_commands = push_commands(platform, CommandScope::Global, specs).await?;
        index.merge(resolve_commands(&inner.commands, &api_commands));

        if !plan.guild_ids.is_empty() {
            let specs = load_commands(&inner.guild_commands, "guild");
            for &guild_id in &plan.guild_ids {
                let scope = CommandScope::Guild(guild_id);
                let api_commands = push_commands(platform, scope, specs.clone()).await?;
                index.merge(resolve_commands(&inner.guild_commands, &api_commands));
                scopes.push(scope);
            }
        }

        let registered = index.len();
        inner.registry.publish(index);

        let mut deleted = 0;
        if plan.delete_orphaned {
            let snapshot = inner.registry.snapshot();
            for scope in scopes {
                deleted += delete_orphaned(platform, scope, &snapshot).await?;
            }
        }

        info!(registered, deleted, "Commands synchronised");
        Ok(SyncReport { registered, deleted })
    }
}
