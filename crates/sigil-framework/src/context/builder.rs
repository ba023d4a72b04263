//! Context construction.
//!
//! Guild data is resolved strictly: guild, member and channel are fetched in
//! that order and any failure aborts the dispatch with an error naming the
//! failing resource. A channel fetch that succeeds without returning a
//! channel is a failure too.

use std::sync::Arc;

use sigil_core::{
    BoxedPlatform, CommandType, DiagnosticError, ErrorKind, GuildStep, Interaction,
    InteractionKind, InteractionTarget, Platform,
};
use tracing::trace;

use super::{AutocompleteContext, CommandContext, ContextKind, GuildInfo, Scope};
use crate::command::{OptionParser, ParsedOptions};
use crate::locale::{LocaleDetector, Translator};
use crate::resolver::ResolvedCommand;

/// Resolves the guild, member and channel of a guild invocation.
///
/// Returns `Ok(None)` outside a guild, and for guilds where the application
/// is not installed.
pub async fn resolve_guild(
    platform: &dyn Platform,
    interaction: &Interaction,
) -> Result<Option<GuildInfo>, DiagnosticError> {
    if !interaction.is_guild() {
        return Ok(None);
    }
    let Some(guild_id) = interaction.guild_id else {
        return Ok(None);
    };

    let guild = platform
        .fetch_guild(guild_id)
        .await
        .map_err(|e| DiagnosticError::guild_fetch(GuildStep::Guild, e))?;
    trace!(guild_id, "Fetched guild");

    let member = platform
        .fetch_member(guild.id, interaction.user.id)
        .await
        .map_err(|e| DiagnosticError::guild_fetch(GuildStep::Member, e))?;
    trace!(guild_id, user_id = interaction.user.id, "Fetched member");

    let missing_channel = || {
        DiagnosticError::new(
            ErrorKind::GuildResolution(GuildStep::Channel),
            "failed to get channel: the platform returned no channel",
        )
        .with_debug("guild_id", guild_id)
    };
    let channel_id = interaction.channel_id.ok_or_else(missing_channel)?;
    let channel = platform
        .fetch_channel(channel_id)
        .await
        .map_err(|e| DiagnosticError::guild_fetch(GuildStep::Channel, e))?
        .ok_or_else(|| missing_channel().with_debug("channel_id", channel_id))?;
    trace!(channel_id, "Fetched channel");

    Ok(Some(GuildInfo {
        guild,
        member,
        channel,
    }))
}

/// Builds invocation contexts.
#[derive(Clone)]
pub struct ContextBuilder {
    platform: BoxedPlatform,
    locale: Arc<dyn LocaleDetector>,
    translator: Arc<dyn Translator>,
    parser: Arc<dyn OptionParser>,
}

impl ContextBuilder {
    pub fn new(
        platform: BoxedPlatform,
        locale: Arc<dyn LocaleDetector>,
        translator: Arc<dyn Translator>,
        parser: Arc<dyn OptionParser>,
    ) -> Self {
        Self {
            platform,
            locale,
            translator,
            parser,
        }
    }

    async fn detect_locale(&self, interaction: &Interaction, guild: Option<&GuildInfo>) -> String {
        self.locale
            .detect(
                interaction,
                &interaction.user,
                guild.map(|info| &info.guild),
                guild.map(|info| &info.channel),
            )
            .await
    }

    /// Builds the context of a command invocation.
    ///
    /// Exactly one context kind is produced, chosen by the interaction kind;
    /// the command must declare the matching build section.
    pub async fn build(
        &self,
        command: ResolvedCommand,
        interaction: Arc<Interaction>,
        guild: Option<GuildInfo>,
    ) -> Result<CommandContext, DiagnosticError> {
        let build = command.command.build();
        let kind = match interaction.kind {
            InteractionKind::Command(CommandType::ChatInput) | InteractionKind::Autocomplete => {
                let slash = build
                    .slash
                    .as_ref()
                    .ok_or_else(|| missing_section(&command, CommandType::ChatInput))?;
                let options = match &slash.options {
                    Some(schema) => self
                        .parser
                        .parse(&interaction, schema)
                        .await
                        .map_err(|e| {
                            DiagnosticError::context(format!("failed to parse options: {e}"))
                                .with_debug("command", slash.name.as_str())
                                .with_cause(e)
                        })?,
                    None => ParsedOptions::default(),
                };
                ContextKind::Slash { options }
            }
            InteractionKind::Command(CommandType::User) => {
                if build.user.is_none() {
                    return Err(missing_section(&command, CommandType::User));
                }
                let Some(InteractionTarget::User { user, member }) = &interaction.target else {
                    return Err(DiagnosticError::context("user command without a target user"));
                };
                let target_member = match (&guild, member) {
                    (Some(info), Some(_)) => Some(
                        self.platform
                            .fetch_member(info.guild.id, user.id)
                            .await
                            .map_err(|e| DiagnosticError::guild_fetch(GuildStep::TargetMember, e))?,
                    ),
                    _ => None,
                };
                ContextKind::User {
                    target_user: user.clone(),
                    target_member,
                }
            }
            InteractionKind::Command(CommandType::Message) => {
                if build.message.is_none() {
                    return Err(missing_section(&command, CommandType::Message));
                }
                let Some(InteractionTarget::Message(message)) = &interaction.target else {
                    return Err(DiagnosticError::context(
                        "message command without a target message",
                    ));
                };
                ContextKind::Message {
                    message: message.clone(),
                }
            }
        };

        let locale = self.detect_locale(&interaction, guild.as_ref()).await;
        trace!(locale = %locale, "Detected locale");

        Ok(CommandContext::new(
            command,
            interaction,
            Arc::clone(&self.platform),
            Scope::from_guild(guild),
            kind,
            locale,
            Arc::clone(&self.translator),
        ))
    }

    /// Builds the context of an autocomplete request.
    pub async fn build_autocomplete(
        &self,
        command: ResolvedCommand,
        interaction: Arc<Interaction>,
        guild: Option<GuildInfo>,
    ) -> Result<AutocompleteContext, DiagnosticError> {
        let focused = interaction
            .focused
            .clone()
            .ok_or_else(|| DiagnosticError::context("autocomplete request without a focused option"))?;
        let value = interaction.focused_value().unwrap_or_default();
        let locale = self.detect_locale(&interaction, guild.as_ref()).await;

        Ok(AutocompleteContext::new(
            command,
            interaction,
            Scope::from_guild(guild),
            locale,
            Arc::clone(&self.translator),
            focused,
            value,
        ))
    }
}

fn missing_section(command: &ResolvedCommand, kind: CommandType) -> DiagnosticError {
    DiagnosticError::context(format!(
        "command '{}' has no {} build",
        command.command.name(),
        kind.as_str()
    ))
    .with_debug("resolved_key", command.resolved_key.as_str())
}
