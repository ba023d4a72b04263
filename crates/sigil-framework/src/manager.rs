//! The command manager and the dispatch pipeline.
//!
//! [`CommandManager`] owns everything a dispatch needs and drives one
//! interaction through the pipeline:
//!
//! ```text
//! Resolving → Precheck → GuildResolve → ContextBuild → Middleware(0..n) → Execute → ResultHandled
//! ```
//!
//! - Resolution and precondition failures go straight to the result handler
//!   without building a context.
//! - A precondition answering "don't continue" ends the dispatch silently:
//!   no reply is sent and the result handler is not called.
//! - Every other path ends with exactly one result handler call.
//!
//! Autocomplete requests take a shorter path through the same resolver and
//! guild resolution; they never reach the result handler and never send an
//! error reply.
//!
//! The manager is a cheap-to-clone handle and implements
//! `tower::Service<Interaction>`, so tower layers can be applied to it.
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil_framework::manager::CommandManager;
//!
//! let manager = CommandManager::builder()
//!     .command(ping)
//!     .developers([1234])
//!     .build(platform);
//!
//! manager.sync(&SyncPlan::default()).await?;
//! let outcome = manager.dispatch(interaction).await;
//! ```

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use sigil_core::{
    AutocompleteChoice, BoxedPlatform, DiagnosticError, ErrorKind, Interaction, InteractionKind,
    Snowflake,
};
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::command::{
    Command, DispatchResult, OptionParser, SchemaOptionParser, Success, command_display,
};
use crate::context::{ContextBuilder, resolve_guild};
use crate::cooldown::CooldownManager;
use crate::executor::{DispatchTimer, Timing, execute, panic_message};
use crate::locale::{DefaultLocaleDetector, IdentityTranslator, LocaleDetector, Translator};
use crate::middleware::{ChainOutcome, run_chain};
use crate::precondition::{Precondition, PreconditionGate, PreconditionRequest};
use crate::registry::CommandRegistry;
use crate::resolver::resolve;
use crate::result::{
    DefaultResultHandler, MessageTemplates, ResultHandler, ResultInfo, log_diagnostic,
};


/// Emits a trace line only when internal tracing is enabled.
macro_rules! internal_trace {
    ($inner:expr, $($arg:tt)+) => {
        if $inner.internal_trace {
            trace!($($arg)+);
        }
    };
}

// ============================================================================
// Outcome
// ============================================================================

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A precondition declined the dispatch, or the interaction needed no
    /// handling. Nothing was sent.
    Skipped,
    /// The command completed and the audit line was logged.
    Succeeded(Success),
    /// The command failed and the user was notified.
    Failed { id: String, kind: ErrorKind },
    /// Autocomplete choices were sent.
    Autocompleted { choices: Vec<AutocompleteChoice> },
    /// Autocomplete failed; the failure was logged only.
    AutocompleteFailed { id: String },
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CommandManager`].
pub struct CommandManagerBuilder {
    commands: Vec<Command>,
    guild_commands: Vec<Command>,
    developers: Vec<Snowflake>,
    preconditions: Vec<Arc<dyn Precondition>>,
    cooldowns: Option<Arc<CooldownManager>>,
    result_handler: Option<Arc<dyn ResultHandler>>,
    locale_detector: Option<Arc<dyn LocaleDetector>>,
    translator: Arc<dyn Translator>,
    option_parser: Arc<dyn OptionParser>,
    templates: MessageTemplates,
    default_locale: String,
    internal_trace: bool,
}

impl Default for CommandManagerBuilder {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            guild_commands: Vec::new(),
            developers: Vec::new(),
            preconditions: Vec::new(),
            cooldowns: None,
            result_handler: None,
            locale_detector: None,
            translator: Arc::new(IdentityTranslator),
            option_parser: Arc::new(SchemaOptionParser),
            templates: MessageTemplates::default(),
            default_locale: "en-US".to_string(),
            internal_trace: false,
        }
    }
}

impl CommandManagerBuilder {
    /// Adds a globally registered command.
    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Adds a command registered in every configured guild.
    pub fn guild_command(mut self, command: impl Into<Command>) -> Self {
        self.guild_commands.push(command.into());
        self
    }

    pub fn developers(mut self, developers: impl IntoIterator<Item = Snowflake>) -> Self {
        self.developers.extend(developers);
        self
    }

    /// Appends a custom precondition. Custom preconditions run after the
    /// built-in developer and permission checks, in registration order.
    pub fn precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Shares a cooldown manager, e.g. one with a cleanup task running.
    pub fn cooldowns(mut self, cooldowns: Arc<CooldownManager>) -> Self {
        self.cooldowns = Some(cooldowns);
        self
    }

    /// Replaces the default result handler. Message templates are ignored
    /// afterwards.
    pub fn result_handler(mut self, handler: Arc<dyn ResultHandler>) -> Self {
        self.result_handler = Some(handler);
        self
    }

    pub fn locale_detector(mut self, detector: Arc<dyn LocaleDetector>) -> Self {
        self.locale_detector = Some(detector);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn option_parser(mut self, parser: Arc<dyn OptionParser>) -> Self {
        self.option_parser = parser;
        self
    }

    pub fn templates(mut self, templates: MessageTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Locale used when neither the interaction nor the guild has one.
    pub fn default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Enables the framework's per-step trace lines.
    pub fn internal_trace(mut self, enabled: bool) -> Self {
        self.internal_trace = enabled;
        self
    }

    pub fn build(self, platform: BoxedPlatform) -> CommandManager {
        let mut gate = PreconditionGate::new(self.developers);
        if let Some(cooldowns) = self.cooldowns {
            gate = gate.with_cooldowns(cooldowns);
        }
        for precondition in self.preconditions {
            gate.push(precondition);
        }

        let locale_detector = self
            .locale_detector
            .unwrap_or_else(|| Arc::new(DefaultLocaleDetector::new(self.default_locale)));
        let result_handler = self
            .result_handler
            .unwrap_or_else(|| Arc::new(DefaultResultHandler::new(self.templates)));
        let builder = ContextBuilder::new(
            Arc::clone(&platform),
            locale_detector,
            self.translator,
            self.option_parser,
        );

        CommandManager {
            inner: Arc::new(ManagerInner {
                platform,
                registry: CommandRegistry::new(),
                commands: self.commands,
                guild_commands: self.guild_commands,
                gate,
                builder,
                result_handler,
                internal_trace: self.internal_trace,
            }),
        }
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Owns the registry and runs the dispatch pipeline.
#[derive(Clone)]
pub struct CommandManager {
    inner: Arc<ManagerInner>,
}

pub(crate) struct ManagerInner {
    pub(crate) platform: BoxedPlatform,
    pub(crate) registry: CommandRegistry,
    pub(crate) commands: Vec<Command>,
    pub(crate) guild_commands: Vec<Command>,
    gate: PreconditionGate,
    builder: ContextBuilder,
    result_handler: Arc<dyn ResultHandler>,
    pub(crate) internal_trace: bool,
}

impl CommandManager {
    pub fn builder() -> CommandManagerBuilder {
        CommandManagerBuilder::default()
    }

    pub fn platform(&self) -> &BoxedPlatform {
        &self.inner.platform
    }

    /// The registry holding the current resolved index.
    pub fn registry(&self) -> &CommandRegistry {
        &self.inner.registry
    }

    pub fn cooldowns(&self) -> &Arc<CooldownManager> {
        self.inner.gate.cooldown_manager()
    }

    pub(crate) fn inner(&self) -> &ManagerInner {
        &self.inner
    }

    /// Dispatches one interaction to completion.
    ///
    /// Never fails: every failure is reported through the result handler (or
    /// logged, for autocomplete) and summarized in the returned outcome.
    pub async fn dispatch(&self, interaction: Interaction) -> DispatchOutcome {
        let span = debug_span!(
            "dispatch",
            interaction_id = interaction.id,
            command = %interaction.command_name,
        );
        let inner = Arc::clone(&self.inner);
        let interaction = Arc::new(interaction);

        async move {
            let pipeline = match interaction.kind {
                InteractionKind::Command(_) => inner.handle_command(Arc::clone(&interaction)).boxed(),
                InteractionKind::Autocomplete => {
                    inner.handle_autocomplete(Arc::clone(&interaction)).boxed()
                }
            };

            match AssertUnwindSafe(pipeline).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let err = DiagnosticError::internal(format!(
                        "dispatch panicked: {}",
                        panic_message(panic.as_ref())
                    ))
                    .with_debug("interaction_id", interaction.id);
                    log_diagnostic(&err);
                    DispatchOutcome::Failed {
                        id: err.generate_id().to_string(),
                        kind: err.kind().clone(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("commands", &self.inner.commands.len())
            .field("guild_commands", &self.inner.guild_commands.len())
            .field("resolved", &self.inner.registry.snapshot().len())
            .field("gate", &self.inner.gate)
            .finish_non_exhaustive()
    }
}

impl ManagerInner {
    async fn handle_command(&self, interaction: Arc<Interaction>) -> DispatchOutcome {
        let shown = command_display(&interaction);
        let index = self.registry.snapshot();

        // ─── Resolving ───
        let resolved = match resolve(&index, &interaction) {
            Ok(resolved) => resolved,
            Err(e) => {
                let err = DiagnosticError::from(e).with_debug("command", shown.as_str());
                return self.finish(Err(err), &interaction, &shown, false, None).await;
            }
        };
        let handler = Arc::clone(&resolved.command);
        internal_trace!(self, resolved_key = %resolved.resolved_key, "Resolved command");

        // ─── Precheck ───
        let timer = DispatchTimer::start();
        let request = PreconditionRequest {
            command: &resolved,
            platform: self.platform.as_ref(),
            interaction: &interaction,
        };
        let checked = AssertUnwindSafe(self.gate.check(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(DiagnosticError::precondition(format!(
                    "precondition panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
        match checked {
            Ok(true) => {}
            Ok(false) => {
                trace!(command = %shown, "Dispatch skipped by precondition");
                return DispatchOutcome::Skipped;
            }
            Err(err) => {
                return self.finish(Err(err), &interaction, &shown, false, None).await;
            }
        }

        // ─── GuildResolve ───
        let guild = AssertUnwindSafe(resolve_guild(self.platform.as_ref(), &interaction))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(DiagnosticError::internal(format!(
                    "guild resolution panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
        let guild = match guild {
            Ok(guild) => guild,
            Err(err) => {
                return self.finish(Err(err), &interaction, &shown, false, None).await;
            }
        };
        internal_trace!(self, in_guild = guild.is_some(), "Resolved guild data");

        // ─── ContextBuild ───
        let built = AssertUnwindSafe(self.builder.build(resolved, Arc::clone(&interaction), guild))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(DiagnosticError::context(format!(
                    "context build panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
        let ctx = match built {
            Ok(ctx) => Arc::new(ctx),
            Err(err) => {
                return self.finish(Err(err), &interaction, &shown, false, None).await;
            }
        };
        internal_trace!(self, variant = ?ctx.variant(), locale = ctx.locale(), "Built context");

        let options = handler.options();
        if options.pre_reply {
            if let Err(e) = ctx.defer_reply(options.pre_reply_ephemeral).await {
                let err = DiagnosticError::context(format!("failed to defer reply: {e}"))
                    .with_debug("ephemeral", options.pre_reply_ephemeral)
                    .with_cause(e);
                let timing = timer.finish();
                return self.finish(Err(err), &interaction, &shown, false, Some(timing)).await;
            }
        }

        // ─── Middleware / Execute ───
        let result = match run_chain(handler.middleware_list(), &ctx).await {
            ChainOutcome::Completed => {
                internal_trace!(self, "Middleware chain completed");
                execute(&handler, Arc::clone(&ctx)).await
            }
            ChainOutcome::Stopped { middleware, result } => {
                internal_trace!(self, middleware = %middleware, "Middleware chain stopped");
                result.map(|success| stopped_by(&middleware, &success))
            }
        };
        let timing = timer.finish();

        self.finish(result, &interaction, &shown, ctx.replied(), Some(timing))
            .await
    }

    /// Hands the single terminal result to the result handler.
    async fn finish(
        &self,
        result: DispatchResult,
        interaction: &Interaction,
        command_display: &str,
        defer: bool,
        timing: Option<Timing>,
    ) -> DispatchOutcome {
        if let Err(err) = &result {
            err.generate_id();
        }
        let info = ResultInfo {
            interaction,
            command_display,
            defer,
            timing,
        };
        self.result_handler
            .handle(&result, &info, self.platform.as_ref())
            .await;

        match result {
            Ok(success) => DispatchOutcome::Succeeded(success),
            Err(err) => DispatchOutcome::Failed {
                id: err.generate_id().to_string(),
                kind: err.kind().clone(),
            },
        }
    }

    async fn handle_autocomplete(&self, interaction: Arc<Interaction>) -> DispatchOutcome {
        let index = self.registry.snapshot();
        let resolved = match resolve(&index, &interaction) {
            Ok(resolved) => resolved,
            Err(e) => return autocomplete_failed(e.into()),
        };

        let Some(complete) = resolved.command.autocomplete_fn().cloned() else {
            warn!(
                command = %resolved.resolved_key,
                "Received autocomplete for a command without an autocomplete function"
            );
            return DispatchOutcome::Skipped;
        };

        let guild = match resolve_guild(self.platform.as_ref(), &interaction).await {
            Ok(guild) => guild,
            Err(err) => return autocomplete_failed(err),
        };
        let ctx = match self
            .builder
            .build_autocomplete(resolved, Arc::clone(&interaction), guild)
            .await
        {
            Ok(ctx) => Arc::new(ctx),
            Err(err) => return autocomplete_failed(err),
        };
        internal_trace!(self, focused = ctx.focused(), "Running autocomplete");

        let choices = match AssertUnwindSafe(complete(ctx)).catch_unwind().await {
            Ok(Ok(choices)) => choices,
            Ok(Err(err)) => return autocomplete_failed(err),
            Err(panic) => {
                return autocomplete_failed(DiagnosticError::handler(format!(
                    "autocomplete panicked: {}",
                    panic_message(panic.as_ref())
                )));
            }
        };

        if let Err(e) = self
            .platform
            .respond_autocomplete(&interaction, choices.clone())
            .await
        {
            return autocomplete_failed(
                DiagnosticError::new(
                    ErrorKind::Delivery,
                    format!("failed to send autocomplete choices: {e}"),
                )
                .with_cause(e),
            );
        }

        debug!(count = choices.len(), "Sent autocomplete choices");
        DispatchOutcome::Autocompleted { choices }
    }
}

/// Names the middleware that ended the dispatch with a success.
fn stopped_by(middleware: &str, success: &Success) -> Success {
    Success::Message(format!(
        "Middleware {middleware} stopped, result : {}",
        success.describe()
    ))
}

fn autocomplete_failed(err: DiagnosticError) -> DispatchOutcome {
    log_diagnostic(&err);
    DispatchOutcome::AutocompleteFailed {
        id: err.generate_id().to_string(),
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

/// Tower Service implementation for CommandManager.
///
/// # Example
///
/// ```rust,ignore
/// use tower::{ServiceBuilder, ServiceExt};
///
/// let service = ServiceBuilder::new()
///     .concurrency_limit(64)
///     .service(manager.clone());
/// let outcome = service.oneshot(interaction).await?;
/// ```
impl Service<Interaction> for CommandManager {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, interaction: Interaction) -> Self::Future {
        let manager = self.clone();

        Box::pin(async move { Ok(manager.dispatch(interaction).await) })
    }
}
