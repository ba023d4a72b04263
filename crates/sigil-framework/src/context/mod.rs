//! Invocation contexts.
//!
//! One [`CommandContext`] is built per dispatch and shared by `Arc` between
//! the middleware chain and the handler. It never outlives the dispatch.
//!
//! The six concrete context shapes (guild or DM, times slash, user-target or
//! message-target) are expressed as two tags rather than six types:
//! - [`Scope`] says whether guild data is available
//! - [`ContextKind`] carries the payload of the matched build section
//!
//! [`CommandContext::variant`] folds both into a single [`ContextVariant`]
//! for code that wants to match on the concrete shape.

mod autocomplete;
mod builder;

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sigil_core::{
    ApiResult, BoxedPlatform, Channel, DiagnosticError, Guild, Interaction, Member, Message,
    ReplyPayload, User,
};

use crate::command::{DispatchResult, ParsedOptions, Success};
use crate::locale::Translator;
use crate::resolver::ResolvedCommand;

pub use autocomplete::AutocompleteContext;
pub use builder::{ContextBuilder, resolve_guild};

/// A value produced by a middleware.
pub type SideValue = Arc<dyn Any + Send + Sync>;

/// Guild data resolved for a guild invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub guild: Guild,
    pub member: Member,
    pub channel: Channel,
}

/// Where the command was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Guild(GuildInfo),
    /// Direct message, or a guild where the application is not installed.
    Dm,
}

impl Scope {
    pub fn from_guild(info: Option<GuildInfo>) -> Self {
        info.map_or(Self::Dm, Self::Guild)
    }

    pub fn guild_info(&self) -> Option<&GuildInfo> {
        match self {
            Self::Guild(info) => Some(info),
            Self::Dm => None,
        }
    }
}

/// Payload of the matched build section.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextKind {
    Slash {
        options: ParsedOptions,
    },
    User {
        target_user: User,
        /// Refetched from the platform for guild invocations.
        target_member: Option<Member>,
    },
    Message {
        message: Message,
    },
}

/// The concrete shape of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextVariant {
    GuildSlash,
    DmSlash,
    GuildUser,
    DmUser,
    GuildMessage,
    DmMessage,
}

/// The per-invocation context handed to middleware and handlers.
pub struct CommandContext {
    command: ResolvedCommand,
    interaction: Arc<Interaction>,
    platform: BoxedPlatform,
    scope: Scope,
    kind: ContextKind,
    locale: String,
    translator: Arc<dyn Translator>,
    defer: AtomicBool,
    has_reply: AtomicBool,
    side_values: Mutex<Vec<(String, SideValue)>>,
}

impl CommandContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        command: ResolvedCommand,
        interaction: Arc<Interaction>,
        platform: BoxedPlatform,
        scope: Scope,
        kind: ContextKind,
        locale: String,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            command,
            interaction,
            platform,
            scope,
            kind,
            locale,
            translator,
            defer: AtomicBool::new(false),
            has_reply: AtomicBool::new(false),
            side_values: Mutex::new(Vec::new()),
        }
    }

    // ─── Invocation data ──────────────────────────────────────────────────────

    pub fn command(&self) -> &ResolvedCommand {
        &self.command
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn platform(&self) -> &BoxedPlatform {
        &self.platform
    }

    /// The invoking user.
    pub fn user(&self) -> &User {
        &self.interaction.user
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn kind(&self) -> &ContextKind {
        &self.kind
    }

    pub fn variant(&self) -> ContextVariant {
        let in_guild = matches!(self.scope, Scope::Guild(_));
        match (&self.kind, in_guild) {
            (ContextKind::Slash { .. }, true) => ContextVariant::GuildSlash,
            (ContextKind::Slash { .. }, false) => ContextVariant::DmSlash,
            (ContextKind::User { .. }, true) => ContextVariant::GuildUser,
            (ContextKind::User { .. }, false) => ContextVariant::DmUser,
            (ContextKind::Message { .. }, true) => ContextVariant::GuildMessage,
            (ContextKind::Message { .. }, false) => ContextVariant::DmMessage,
        }
    }

    pub fn guild(&self) -> Option<&Guild> {
        self.scope.guild_info().map(|info| &info.guild)
    }

    pub fn member(&self) -> Option<&Member> {
        self.scope.guild_info().map(|info| &info.member)
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.scope.guild_info().map(|info| &info.channel)
    }

    /// Parsed options of a slash invocation.
    pub fn options(&self) -> Option<&ParsedOptions> {
        match &self.kind {
            ContextKind::Slash { options } => Some(options),
            _ => None,
        }
    }

    pub fn target_user(&self) -> Option<&User> {
        match &self.kind {
            ContextKind::User { target_user, .. } => Some(target_user),
            _ => None,
        }
    }

    pub fn target_member(&self) -> Option<&Member> {
        match &self.kind {
            ContextKind::User { target_member, .. } => target_member.as_ref(),
            _ => None,
        }
    }

    pub fn target_message(&self) -> Option<&Message> {
        match &self.kind {
            ContextKind::Message { message } => Some(message),
            _ => None,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Translates a key in the detected locale.
    pub fn t(&self, key: &str) -> String {
        self.translator.translate(&self.locale, key)
    }

    // ─── Reply state ──────────────────────────────────────────────────────────

    /// Returns `true` once the reply was deferred.
    pub fn is_deferred(&self) -> bool {
        self.defer.load(Ordering::SeqCst)
    }

    /// Returns `true` once an initial reply was sent.
    pub fn has_reply(&self) -> bool {
        self.has_reply.load(Ordering::SeqCst)
    }

    /// Returns `true` if a further response has to edit the existing one.
    pub fn replied(&self) -> bool {
        self.is_deferred() || self.has_reply()
    }

    /// Sends the initial reply.
    pub async fn reply(&self, content: impl Into<String>) -> ApiResult<()> {
        self.send(ReplyPayload::new(content)).await
    }

    /// Sends the initial reply, visible only to the invoking user.
    pub async fn reply_ephemeral(&self, content: impl Into<String>) -> ApiResult<()> {
        self.send(ReplyPayload::ephemeral(content)).await
    }

    async fn send(&self, payload: ReplyPayload) -> ApiResult<()> {
        self.platform.reply(&self.interaction, payload).await?;
        self.has_reply.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Edits the initial or deferred reply.
    pub async fn edit_reply(&self, content: impl Into<String>) -> ApiResult<()> {
        self.platform
            .edit_reply(&self.interaction, ReplyPayload::new(content))
            .await?;
        self.has_reply.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Acknowledges the interaction without answering yet.
    pub async fn defer_reply(&self, ephemeral: bool) -> ApiResult<()> {
        self.platform.defer_reply(&self.interaction, ephemeral).await?;
        self.defer.store(true, Ordering::SeqCst);
        Ok(())
    }

    // ─── Result helpers ───────────────────────────────────────────────────────

    pub fn ok(&self) -> DispatchResult {
        Ok(Success::Done)
    }

    pub fn ok_with(&self, message: impl Into<String>) -> DispatchResult {
        Ok(Success::Message(message.into()))
    }

    pub fn error(&self, message: impl Into<String>) -> DispatchResult {
        Err(DiagnosticError::handler(message))
    }

    // ─── Side values ──────────────────────────────────────────────────────────

    /// Stores a middleware value under the middleware's name.
    pub(crate) fn set_side_value(&self, name: &str, value: SideValue) {
        let mut values = self.side_values.lock();
        match values.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => values.push((name.to_string(), value)),
        }
    }

    /// Returns the value a middleware produced, if it has the requested type.
    pub fn side_value<T: Any + Send + Sync>(&self, middleware: &str) -> Option<Arc<T>> {
        let value = self
            .side_values
            .lock()
            .iter()
            .find(|(key, _)| key == middleware)
            .map(|(_, value)| Arc::clone(value))?;
        value.downcast::<T>().ok()
    }

    /// Names of the middleware that produced a value, in production order.
    pub fn side_value_names(&self) -> Vec<String> {
        self.side_values
            .lock()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("command", &self.command.resolved_key)
            .field("interaction", &self.interaction.id)
            .field("variant", &self.variant())
            .field("locale", &self.locale)
            .field("defer", &self.is_deferred())
            .field("has_reply", &self.has_reply())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::IdentityTranslator;
    use crate::testing::{InteractionFixture, MockPlatform, PlatformCall, guild_info, resolved};

    fn context(platform: Arc<MockPlatform>, scope: Scope) -> CommandContext {
        CommandContext::new(
            resolved("ping"),
            Arc::new(InteractionFixture::slash("ping", 1).build()),
            platform,
            scope,
            ContextKind::Slash {
                options: ParsedOptions::default(),
            },
            "en-US".into(),
            Arc::new(IdentityTranslator),
        )
    }

    #[test]
    fn test_variant() {
        let platform = Arc::new(MockPlatform::new());
        let ctx = context(platform.clone(), Scope::Dm);
        assert_eq!(ctx.variant(), ContextVariant::DmSlash);
        assert!(ctx.guild().is_none());

        let ctx = context(platform, Scope::Guild(guild_info(5, 20)));
        assert_eq!(ctx.variant(), ContextVariant::GuildSlash);
        assert_eq!(ctx.channel().map(|c| c.id), Some(20));
    }

    #[tokio::test]
    async fn test_reply_flags() {
        let platform = Arc::new(MockPlatform::new());
        let ctx = context(platform.clone(), Scope::Dm);
        assert!(!ctx.replied());

        ctx.defer_reply(true).await.unwrap();
        assert!(ctx.is_deferred());
        assert!(!ctx.has_reply());

        ctx.edit_reply("done").await.unwrap();
        assert!(ctx.has_reply());

        assert_eq!(
            platform.calls(),
            vec![
                PlatformCall::Defer { ephemeral: true },
                PlatformCall::Edit {
                    content: "done".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_reply_leaves_flag_unset() {
        let platform = Arc::new(MockPlatform::new());
        platform.fail_on(crate::testing::FailPoint::Reply);
        let ctx = context(platform, Scope::Dm);

        assert!(ctx.reply("hi").await.is_err());
        assert!(!ctx.has_reply());
    }

    #[test]
    fn test_side_values() {
        let ctx = context(Arc::new(MockPlatform::new()), Scope::Dm);
        ctx.set_side_value("auth", Arc::new(42u32));
        ctx.set_side_value("lang", Arc::new("fr".to_string()));
        ctx.set_side_value("auth", Arc::new(7u32));

        assert_eq!(ctx.side_value::<u32>("auth").as_deref(), Some(&7));
        assert_eq!(ctx.side_value::<String>("lang").as_deref().map(String::as_str), Some("fr"));
        assert!(ctx.side_value::<String>("auth").is_none());
        assert_eq!(ctx.side_value_names(), vec!["auth", "lang"]);
    }

    #[test]
    fn test_result_helpers() {
        let ctx = context(Arc::new(MockPlatform::new()), Scope::Dm);
        assert_eq!(ctx.ok().unwrap(), Success::Done);
        assert_eq!(ctx.ok_with("3 rows").unwrap().describe(), "3 rows");
        assert!(ctx.error("nope").is_err());
        assert_eq!(ctx.t("hello"), "hello");
    }
}
