//! The `Platform` trait.
//!
//! # Caching
//!
//! Implementations are expected to be cache-first for `fetch_*` calls. The
//! framework calls them on every dispatch and does not cache on its own.
//!
//! # Replies
//!
//! Reply primitives mirror the platform's interaction lifecycle:
//! - `reply` sends the initial response
//! - `defer_reply` acknowledges the interaction and shows a loading state
//! - `edit_reply` edits the initial (or deferred) response

use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::{
    ApiResult, ApplicationCommand, AutocompleteChoice, Channel, CommandScope, CommandSpec, Guild,
    Interaction, Member, ReplyPayload, Snowflake,
};

/// A chat-platform client, as seen by the dispatch pipeline.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Fetches a guild by id.
    async fn fetch_guild(&self, guild_id: Snowflake) -> ApiResult<Guild>;

    /// Fetches a guild member.
    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> ApiResult<Member>;

    /// Fetches a channel.
    ///
    /// `Ok(None)` means the platform answered but did not return a channel.
    async fn fetch_channel(&self, channel_id: Snowflake) -> ApiResult<Option<Channel>>;

    /// Sends the initial response to an interaction.
    async fn reply(&self, interaction: &Interaction, payload: ReplyPayload) -> ApiResult<()>;

    /// Acknowledges an interaction, deferring the actual response.
    async fn defer_reply(&self, interaction: &Interaction, ephemeral: bool) -> ApiResult<()>;

    /// Edits the initial or deferred response.
    async fn edit_reply(&self, interaction: &Interaction, payload: ReplyPayload) -> ApiResult<()>;

    /// Answers an autocomplete request.
    async fn respond_autocomplete(
        &self,
        interaction: &Interaction,
        choices: Vec<AutocompleteChoice>,
    ) -> ApiResult<()>;

    /// Replaces the command set of a scope, returning the registered commands.
    async fn set_commands(
        &self,
        scope: CommandScope,
        specs: Vec<CommandSpec>,
    ) -> ApiResult<Vec<ApplicationCommand>>;

    /// Lists the commands registered in a scope.
    async fn fetch_commands(&self, scope: CommandScope) -> ApiResult<Vec<ApplicationCommand>>;

    /// Deletes one registered command.
    async fn delete_command(&self, scope: CommandScope, command_id: Snowflake) -> ApiResult<()>;
}

/// Shared platform handle.
pub type BoxedPlatform = Arc<dyn Platform>;
