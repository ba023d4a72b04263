//! Test doubles and fixtures.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sigil_core::{
    ApiError, ApiResult, ApplicationCommand, AutocompleteChoice, Channel, ChannelKind,
    CommandScope, CommandSpec, CommandType, Guild, Interaction, InteractionKind,
    InteractionTarget, Member, Message, OptionValue, Permissions, Platform, RawOption,
    ReplyPayload, Snowflake, User,
};

use crate::command::{CommandHandler, ParsedOptions, SlashBuild};
use crate::context::{CommandContext, ContextKind, GuildInfo, Scope};
use crate::locale::IdentityTranslator;
use crate::resolver::ResolvedCommand;

// ============================================================================
// MockPlatform
// ============================================================================

/// A recorded platform call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlatformCall {
    FetchGuild(Snowflake),
    FetchMember(Snowflake, Snowflake),
    FetchChannel(Snowflake),
    Reply { content: String, ephemeral: bool },
    Defer { ephemeral: bool },
    Edit { content: String },
    Autocomplete(Vec<AutocompleteChoice>),
    SetCommands(CommandScope, Vec<String>),
    FetchCommands(CommandScope),
    DeleteCommand(CommandScope, Snowflake),
}

impl PlatformCall {
    /// Whether the call answers the user.
    pub(crate) fn is_response(&self) -> bool {
        matches!(
            self,
            Self::Reply { .. } | Self::Defer { .. } | Self::Edit { .. } | Self::Autocomplete(_)
        )
    }
}

/// Calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FailPoint {
    Guild,
    Member,
    Channel,
    Reply,
    Defer,
    Edit,
    Autocomplete,
    SetCommands,
    FetchCommands,
    DeleteCommand,
}

/// An in-memory platform recording every call.
#[derive(Debug, Default)]
pub(crate) struct MockPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    failures: Mutex<HashSet<FailPoint>>,
    no_channel: AtomicBool,
    next_id: AtomicU64,
    registered: Mutex<HashMap<CommandScope, Vec<ApplicationCommand>>>,
}

impl MockPlatform {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn responses(&self) -> Vec<PlatformCall> {
        self.calls().into_iter().filter(PlatformCall::is_response).collect()
    }

    pub(crate) fn fail_on(&self, point: FailPoint) {
        self.failures.lock().insert(point);
    }

    /// Makes `fetch_channel` succeed without a channel.
    pub(crate) fn return_no_channel(&self) {
        self.no_channel.store(true, Ordering::SeqCst);
    }

    pub(crate) fn registered(&self, scope: CommandScope) -> Vec<ApplicationCommand> {
        self.registered.lock().get(&scope).cloned().unwrap_or_default()
    }

    /// Registers a command behind the framework's back.
    pub(crate) fn add_registered(&self, scope: CommandScope, name: &str, kind: CommandType) -> Snowflake {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.registered
            .lock()
            .entry(scope)
            .or_default()
            .push(ApplicationCommand {
                id,
                name: name.to_string(),
                kind,
                guild_id: scope.guild_id(),
            });
        id
    }

    fn record(&self, call: PlatformCall, point: Option<FailPoint>) -> ApiResult<()> {
        self.calls.lock().push(call);
        match point {
            Some(point) if self.failures.lock().contains(&point) => {
                Err(ApiError::other(format!("injected {point:?} failure")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn fetch_guild(&self, guild_id: Snowflake) -> ApiResult<Guild> {
        self.record(PlatformCall::FetchGuild(guild_id), Some(FailPoint::Guild))?;
        Ok(guild(guild_id))
    }

    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> ApiResult<Member> {
        self.record(PlatformCall::FetchMember(guild_id, user_id), Some(FailPoint::Member))?;
        Ok(member(user_id))
    }

    async fn fetch_channel(&self, channel_id: Snowflake) -> ApiResult<Option<Channel>> {
        self.record(PlatformCall::FetchChannel(channel_id), Some(FailPoint::Channel))?;
        if self.no_channel.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(channel(channel_id)))
    }

    async fn reply(&self, _interaction: &Interaction, payload: ReplyPayload) -> ApiResult<()> {
        self.record(
            PlatformCall::Reply {
                content: payload.content,
                ephemeral: payload.ephemeral,
            },
            Some(FailPoint::Reply),
        )
    }

    async fn defer_reply(&self, _interaction: &Interaction, ephemeral: bool) -> ApiResult<()> {
        self.record(PlatformCall::Defer { ephemeral }, Some(FailPoint::Defer))
    }

    async fn edit_reply(&self, _interaction: &Interaction, payload: ReplyPayload) -> ApiResult<()> {
        self.record(
            PlatformCall::Edit {
                content: payload.content,
            },
            Some(FailPoint::Edit),
        )
    }

    async fn respond_autocomplete(
        &self,
        _interaction: &Interaction,
        choices: Vec<AutocompleteChoice>,
    ) -> ApiResult<()> {
        self.record(PlatformCall::Autocomplete(choices), Some(FailPoint::Autocomplete))
    }

    async fn set_commands(
        &self,
        scope: CommandScope,
        specs: Vec<CommandSpec>,
    ) -> ApiResult<Vec<ApplicationCommand>> {
        let names = specs.iter().map(|spec| spec.name.clone()).collect();
        self.record(PlatformCall::SetCommands(scope, names), Some(FailPoint::SetCommands))?;

        let commands: Vec<ApplicationCommand> = specs
            .into_iter()
            .map(|spec| ApplicationCommand {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                name: spec.name,
                kind: spec.kind,
                guild_id: scope.guild_id(),
            })
            .collect();
        self.registered.lock().insert(scope, commands.clone());
        Ok(commands)
    }

    async fn fetch_commands(&self, scope: CommandScope) -> ApiResult<Vec<ApplicationCommand>> {
        self.record(PlatformCall::FetchCommands(scope), Some(FailPoint::FetchCommands))?;
        Ok(self.registered(scope))
    }

    async fn delete_command(&self, scope: CommandScope, command_id: Snowflake) -> ApiResult<()> {
        self.record(
            PlatformCall::DeleteCommand(scope, command_id),
            Some(FailPoint::DeleteCommand),
        )?;
        if let Some(commands) = self.registered.lock().get_mut(&scope) {
            commands.retain(|command| command.id != command_id);
        }
        Ok(())
    }
}

// ============================================================================
// Entity fixtures
// ============================================================================

pub(crate) fn user(id: Snowflake) -> User {
    User::new(id, format!("user-{id}"))
}

pub(crate) fn guild(id: Snowflake) -> Guild {
    Guild {
        id,
        name: format!("guild-{id}"),
        owner_id: 1,
    }
}

pub(crate) fn member(user_id: Snowflake) -> Member {
    Member {
        user: user(user_id),
        nick: None,
        roles: Vec::new(),
        permissions: Permissions::empty(),
    }
}

pub(crate) fn channel(id: Snowflake) -> Channel {
    Channel {
        id,
        name: format!("channel-{id}"),
        kind: ChannelKind::Text,
        guild_id: None,
    }
}

pub(crate) fn guild_info(guild_id: Snowflake, channel_id: Snowflake) -> GuildInfo {
    GuildInfo {
        guild: guild(guild_id),
        member: member(7),
        channel: channel(channel_id),
    }
}

/// A resolved no-op slash command.
pub(crate) fn resolved(name: &str) -> ResolvedCommand {
    ResolvedCommand {
        command: Arc::new(CommandHandler::new(SlashBuild::new(name, "test"), |ctx| async move {
            ctx.ok()
        })),
        resolved_key: format!("1_{name}"),
    }
}

/// A DM slash context over `platform`.
pub(crate) fn dm_context(platform: Arc<MockPlatform>) -> CommandContext {
    CommandContext::new(
        resolved("test"),
        Arc::new(InteractionFixture::slash("test", 1).build()),
        platform,
        Scope::Dm,
        ContextKind::Slash {
            options: ParsedOptions::default(),
        },
        "en-US".into(),
        Arc::new(IdentityTranslator),
    )
}

// ============================================================================
// Interaction fixtures
// ============================================================================

/// Builds interactions. Defaults to a DM invocation by user 7.
pub(crate) struct InteractionFixture {
    interaction: Interaction,
}

impl InteractionFixture {
    fn base(kind: InteractionKind, name: &str, command_id: Snowflake, command_kind: CommandType) -> Self {
        Self {
            interaction: Interaction {
                id: 500,
                kind,
                command: Some(ApplicationCommand {
                    id: command_id,
                    name: name.to_string(),
                    kind: command_kind,
                    guild_id: None,
                }),
                command_name: name.to_string(),
                user: user(7),
                guild_id: None,
                channel_id: None,
                guild_installed: false,
                locale: None,
                guild_locale: None,
                app_permissions: None,
                subcommand_group: None,
                subcommand: None,
                options: Vec::new(),
                focused: None,
                target: None,
            },
        }
    }

    pub(crate) fn slash(name: &str, command_id: Snowflake) -> Self {
        Self::base(
            InteractionKind::Command(CommandType::ChatInput),
            name,
            command_id,
            CommandType::ChatInput,
        )
    }

    pub(crate) fn autocomplete(name: &str, command_id: Snowflake, focused: &str, value: &str) -> Self {
        let mut fixture = Self::base(
            InteractionKind::Autocomplete,
            name,
            command_id,
            CommandType::ChatInput,
        );
        fixture.interaction.focused = Some(focused.to_string());
        fixture.option(focused, OptionValue::String(value.to_string()))
    }

    pub(crate) fn user_menu(name: &str, command_id: Snowflake, target: Snowflake) -> Self {
        let mut fixture = Self::base(
            InteractionKind::Command(CommandType::User),
            name,
            command_id,
            CommandType::User,
        );
        fixture.interaction.target = Some(InteractionTarget::User {
            user: user(target),
            member: Some(member(target)),
        });
        fixture
    }

    pub(crate) fn message_menu(name: &str, command_id: Snowflake) -> Self {
        let mut fixture = Self::base(
            InteractionKind::Command(CommandType::Message),
            name,
            command_id,
            CommandType::Message,
        );
        fixture.interaction.target = Some(InteractionTarget::Message(Message {
            id: 77,
            channel_id: 20,
            author: user(8),
            content: "hello".into(),
        }));
        fixture
    }

    pub(crate) fn group(mut self, group: &str) -> Self {
        self.interaction.subcommand_group = Some(group.to_string());
        self
    }

    pub(crate) fn sub(mut self, sub: &str) -> Self {
        self.interaction.subcommand = Some(sub.to_string());
        self
    }

    pub(crate) fn option(mut self, name: &str, value: OptionValue) -> Self {
        self.interaction.options.push(RawOption::new(name, value));
        self
    }

    pub(crate) fn user(mut self, id: Snowflake) -> Self {
        self.interaction.user = user(id);
        self
    }

    /// Invoked in a guild where the application is installed.
    pub(crate) fn in_guild(mut self, guild_id: Snowflake, channel_id: Snowflake) -> Self {
        self.interaction.guild_id = Some(guild_id);
        self.interaction.channel_id = Some(channel_id);
        self.interaction.guild_installed = true;
        self
    }

    /// Makes the platform command guild-scoped.
    pub(crate) fn command_guild(mut self, guild_id: Snowflake) -> Self {
        if let Some(command) = self.interaction.command.as_mut() {
            command.guild_id = Some(guild_id);
        }
        self
    }

    pub(crate) fn command_id(mut self, id: Snowflake) -> Self {
        if let Some(command) = self.interaction.command.as_mut() {
            command.id = id;
        }
        self
    }

    pub(crate) fn without_command_ref(mut self) -> Self {
        self.interaction.command = None;
        self
    }

    pub(crate) fn build(self) -> Interaction {
        self.interaction
    }
}
