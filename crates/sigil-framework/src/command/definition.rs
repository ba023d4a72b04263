//! Command definition types.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use sigil_core::{AutocompleteChoice, CommandType, DiagnosticError, OptionSpec, Permissions};

use crate::context::{AutocompleteContext, CommandContext};
use crate::cooldown::CooldownConfig;
use crate::middleware::Middleware;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Results
// ============================================================================

/// The success value of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Success {
    /// Plain success.
    Done,
    /// Success with a description for the audit log.
    Message(String),
}

impl Success {
    /// The text written to the audit log.
    pub fn describe(&self) -> &str {
        match self {
            Self::Done => "success",
            Self::Message(msg) => msg,
        }
    }
}

/// The single terminal outcome of a command invocation.
pub type DispatchResult = Result<Success, DiagnosticError>;

/// A type-erased command handler function.
pub type RunFn = Arc<dyn Fn(Arc<CommandContext>) -> BoxFuture<'static, DispatchResult> + Send + Sync>;

/// A type-erased autocomplete function.
pub type AutocompleteFn = Arc<
    dyn Fn(Arc<AutocompleteContext>) -> BoxFuture<'static, Result<Vec<AutocompleteChoice>, DiagnosticError>>
        + Send
        + Sync,
>;

// ============================================================================
// Builds
// ============================================================================

/// The slash section of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct SlashBuild {
    pub name: String,
    pub description: String,
    /// `None` means the command takes no options and parsing is skipped.
    pub options: Option<Vec<OptionSpec>>,
}

impl SlashBuild {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: None,
        }
    }

    /// Declares an option, creating the schema on first use.
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.get_or_insert_with(Vec::new).push(option);
        self
    }
}

/// A user or message context-menu section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenuBuild {
    pub name: String,
}

/// The build sections of a command. Each present section is registered on
/// the platform as its own command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuild {
    pub slash: Option<SlashBuild>,
    pub user: Option<ContextMenuBuild>,
    pub message: Option<ContextMenuBuild>,
}

impl CommandBuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slash(mut self, build: SlashBuild) -> Self {
        self.slash = Some(build);
        self
    }

    pub fn user(mut self, name: impl Into<String>) -> Self {
        self.user = Some(ContextMenuBuild { name: name.into() });
        self
    }

    pub fn message(mut self, name: impl Into<String>) -> Self {
        self.message = Some(ContextMenuBuild { name: name.into() });
        self
    }

    /// Declared name of the section for `kind`.
    pub fn name_for(&self, kind: CommandType) -> Option<&str> {
        match kind {
            CommandType::ChatInput => self.slash.as_ref().map(|b| b.name.as_str()),
            CommandType::User => self.user.as_ref().map(|b| b.name.as_str()),
            CommandType::Message => self.message.as_ref().map(|b| b.name.as_str()),
        }
    }

    /// Every present section, in slash / user / message order.
    pub fn sections(&self) -> Vec<(CommandType, &str)> {
        [CommandType::ChatInput, CommandType::User, CommandType::Message]
            .into_iter()
            .filter_map(|kind| self.name_for(kind).map(|name| (kind, name)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slash.is_none() && self.user.is_none() && self.message.is_none()
    }
}

impl From<SlashBuild> for CommandBuild {
    fn from(build: SlashBuild) -> Self {
        Self::new().slash(build)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Precondition options of a command.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Only users listed as developers may run the command.
    pub developer_only: bool,
    /// Permissions the application needs in the invoking channel.
    pub required_permissions: Permissions,
    /// Defer the reply before middleware runs.
    pub pre_reply: bool,
    /// Whether the deferred reply is ephemeral.
    pub pre_reply_ephemeral: bool,
    pub cooldown: Option<CooldownConfig>,
}

/// A runnable command.
pub struct CommandHandler {
    build: CommandBuild,
    options: CommandOptions,
    middleware: Vec<Arc<dyn Middleware>>,
    run: RunFn,
    autocomplete: Option<AutocompleteFn>,
}

impl CommandHandler {
    /// Creates a handler from its build sections and run function.
    pub fn new<F, Fut>(build: impl Into<CommandBuild>, run: F) -> Self
    where
        F: Fn(Arc<CommandContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult> + Send + 'static,
    {
        Self {
            build: build.into(),
            options: CommandOptions::default(),
            middleware: Vec::new(),
            run: Arc::new(
                move |ctx: Arc<CommandContext>| -> BoxFuture<'static, DispatchResult> {
                    Box::pin(run(ctx))
                },
            ),
            autocomplete: None,
        }
    }

    pub fn with_options(mut self, options: CommandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn developer_only(mut self) -> Self {
        self.options.developer_only = true;
        self
    }

    pub fn require_permissions(mut self, permissions: Permissions) -> Self {
        self.options.required_permissions |= permissions;
        self
    }

    /// Defers the reply before middleware runs.
    pub fn pre_reply(mut self, ephemeral: bool) -> Self {
        self.options.pre_reply = true;
        self.options.pre_reply_ephemeral = ephemeral;
        self
    }

    pub fn cooldown(mut self, cooldown: CooldownConfig) -> Self {
        self.options.cooldown = Some(cooldown);
        self
    }

    /// Appends a middleware. Middleware runs in the order it is added.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn autocomplete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<AutocompleteContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<AutocompleteChoice>, DiagnosticError>> + Send + 'static,
    {
        self.autocomplete = Some(Arc::new(
            move |ctx: Arc<AutocompleteContext>| -> BoxFuture<'static, Result<Vec<AutocompleteChoice>, DiagnosticError>> {
                Box::pin(f(ctx))
            },
        ));
        self
    }

    pub fn build(&self) -> &CommandBuild {
        &self.build
    }

    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    pub fn middleware_list(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    pub fn autocomplete_fn(&self) -> Option<&AutocompleteFn> {
        self.autocomplete.as_ref()
    }

    /// Name of the first declared section.
    pub fn name(&self) -> &str {
        self.build
            .sections()
            .first()
            .map(|(_, name)| *name)
            .unwrap_or("<unnamed>")
    }

    /// Starts the run function.
    pub fn call(&self, ctx: Arc<CommandContext>) -> BoxFuture<'static, DispatchResult> {
        (self.run)(ctx)
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandler")
            .field("build", &self.build)
            .field("options", &self.options)
            .field("middleware_count", &self.middleware.len())
            .field("autocomplete", &self.autocomplete.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Sub-commands
// ============================================================================

fn find_sub<'a>(list: &'a [Arc<CommandHandler>], name: &str) -> Option<&'a Arc<CommandHandler>> {
    list.iter()
        .find(|handler| handler.build().name_for(CommandType::ChatInput) == Some(name))
}

/// A named group of sub-commands.
#[derive(Debug, Clone)]
pub struct SubCommandGroup {
    name: String,
    description: String,
    sub_commands: Vec<Arc<CommandHandler>>,
}

impl SubCommandGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sub_commands: Vec::new(),
        }
    }

    /// Adds a sub-command. Its build-name is its slash name.
    pub fn sub_command(mut self, handler: CommandHandler) -> Self {
        self.sub_commands.push(Arc::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sub_commands(&self) -> &[Arc<CommandHandler>] {
        &self.sub_commands
    }

    /// Finds a sub-command by exact build-name.
    pub fn find(&self, name: &str) -> Option<&Arc<CommandHandler>> {
        find_sub(&self.sub_commands, name)
    }
}

/// A slash command whose behaviour lives in sub-commands.
#[derive(Debug, Clone)]
pub struct SubCommandContainer {
    name: String,
    description: String,
    sub_commands: Vec<Arc<CommandHandler>>,
    groups: BTreeMap<String, SubCommandGroup>,
}

impl SubCommandContainer {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sub_commands: Vec::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Adds a top-level sub-command.
    pub fn sub_command(mut self, handler: CommandHandler) -> Self {
        self.sub_commands.push(Arc::new(handler));
        self
    }

    /// Adds a sub-command group, replacing any group with the same name.
    pub fn group(mut self, group: SubCommandGroup) -> Self {
        self.groups.insert(group.name.clone(), group);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sub_commands(&self) -> &[Arc<CommandHandler>] {
        &self.sub_commands
    }

    pub fn groups(&self) -> impl Iterator<Item = &SubCommandGroup> {
        self.groups.values()
    }

    pub fn get_group(&self, name: &str) -> Option<&SubCommandGroup> {
        self.groups.get(name)
    }

    /// Finds a top-level sub-command by exact build-name.
    pub fn find(&self, name: &str) -> Option<&Arc<CommandHandler>> {
        find_sub(&self.sub_commands, name)
    }
}

// ============================================================================
// Command
// ============================================================================

/// A registered command definition.
#[derive(Debug, Clone)]
pub enum Command {
    Handler(Arc<CommandHandler>),
    SubCommands(Arc<SubCommandContainer>),
}

impl Command {
    /// Name of the command (first section for handlers).
    pub fn name(&self) -> &str {
        match self {
            Self::Handler(handler) => handler.name(),
            Self::SubCommands(container) => container.name(),
        }
    }

    /// `(kind, name)` of every platform command this definition registers.
    pub fn sections(&self) -> Vec<(CommandType, &str)> {
        match self {
            Self::Handler(handler) => handler.build().sections(),
            Self::SubCommands(container) => vec![(CommandType::ChatInput, container.name())],
        }
    }
}

impl From<CommandHandler> for Command {
    fn from(handler: CommandHandler) -> Self {
        Self::Handler(Arc::new(handler))
    }
}

impl From<SubCommandContainer> for Command {
    fn from(container: SubCommandContainer) -> Self {
        Self::SubCommands(Arc::new(container))
    }
}
