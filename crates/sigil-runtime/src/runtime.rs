//! Runtime orchestration.
//!
//! The runtime owns the configuration and the command definitions. Starting
//! it against a platform builds the [`CommandManager`], syncs commands and
//! starts the cooldown sweeper; running it pumps interactions from a channel
//! into the manager, one task per interaction.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sigil_runtime::SigilRuntime;
//!
//! let runtime = SigilRuntime::new();
//! runtime.register_command(ping).await;
//!
//! // `rx` yields interactions from the platform gateway.
//! runtime.run(platform, rx).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sigil_core::{BoxedPlatform, Interaction};
use sigil_framework::{
    Command, CommandManager, CooldownManager, DispatchOutcome, LocaleDetector, MessageTemplates,
    Precondition, ResultHandler, SyncPlan, Translator,
};
use tokio::signal;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, SigilConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Optional pipeline collaborators replacing the defaults.
#[derive(Default)]
struct Overrides {
    result_handler: Option<Arc<dyn ResultHandler>>,
    locale_detector: Option<Arc<dyn LocaleDetector>>,
    translator: Option<Arc<dyn Translator>>,
}

/// The Sigil runtime.
pub struct SigilRuntime {
    config: SigilConfig,
    commands: Arc<RwLock<Vec<Command>>>,
    guild_commands: Arc<RwLock<Vec<Command>>>,
    preconditions: Arc<RwLock<Vec<Arc<dyn Precondition>>>>,
    overrides: RwLock<Overrides>,
    cooldowns: Arc<CooldownManager>,
    /// Present while running.
    manager: Arc<RwLock<Option<CommandManager>>>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
    running: Arc<RwLock<bool>>,
}

impl SigilRuntime {
    /// Creates a runtime from the config in the current directory, falling
    /// back to defaults when it cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                SigilConfig::default()
            });

        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration and initializes logging.
    pub fn from_config(config: &SigilConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            guilds = config.commands.guild_ids.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            commands: Arc::new(RwLock::new(Vec::new())),
            guild_commands: Arc::new(RwLock::new(Vec::new())),
            preconditions: Arc::new(RwLock::new(Vec::new())),
            overrides: RwLock::new(Overrides::default()),
            cooldowns: Arc::new(CooldownManager::new()),
            manager: Arc::new(RwLock::new(None)),
            cleanup: Mutex::new(None),
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn config(&self) -> &SigilConfig {
        &self.config
    }

    /// The cooldown store shared with every manager this runtime builds.
    pub fn cooldowns(&self) -> &Arc<CooldownManager> {
        &self.cooldowns
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a global command. Takes effect on the next start.
    pub async fn register_command(&self, command: impl Into<Command>) {
        let command = command.into();
        debug!(command = command.name(), "Registered command");
        self.commands.write().await.push(command);
    }

    /// Registers several global commands at once.
    pub async fn register_commands(&self, commands: impl IntoIterator<Item = Command>) {
        self.commands.write().await.extend(commands);
    }

    /// Registers a command pushed to every guild in `commands.guild_ids`.
    pub async fn register_guild_command(&self, command: impl Into<Command>) {
        let command = command.into();
        debug!(command = command.name(), "Registered guild command");
        self.guild_commands.write().await.push(command);
    }

    pub async fn register_precondition(&self, precondition: Arc<dyn Precondition>) {
        self.preconditions.write().await.push(precondition);
    }

    pub async fn set_result_handler(&self, handler: Arc<dyn ResultHandler>) {
        self.overrides.write().await.result_handler = Some(handler);
    }

    pub async fn set_locale_detector(&self, detector: Arc<dyn LocaleDetector>) {
        self.overrides.write().await.locale_detector = Some(detector);
    }

    pub async fn set_translator(&self, translator: Arc<dyn Translator>) {
        self.overrides.write().await.translator = Some(translator);
    }

    pub async fn command_count(&self) -> usize {
        self.commands.read().await.len() + self.guild_commands.read().await.len()
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// The manager of the running runtime.
    pub async fn manager(&self) -> Option<CommandManager> {
        self.manager.read().await.clone()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn build_manager(&self, platform: BoxedPlatform) -> CommandManager {
        let commands = &self.config.commands;
        let mut builder = CommandManager::builder()
            .developers(commands.developers.iter().copied())
            .default_locale(commands.default_locale.clone())
            .internal_trace(commands.enable_internal_trace)
            .templates(MessageTemplates {
                internal_error: commands.messages.internal_error.clone(),
            })
            .cooldowns(Arc::clone(&self.cooldowns));

        for command in self.commands.read().await.iter() {
            builder = builder.command(command.clone());
        }
        for command in self.guild_commands.read().await.iter() {
            builder = builder.guild_command(command.clone());
        }
        for precondition in self.preconditions.read().await.iter() {
            builder = builder.precondition(Arc::clone(precondition));
        }

        let overrides = self.overrides.read().await;
        if let Some(handler) = &overrides.result_handler {
            builder = builder.result_handler(Arc::clone(handler));
        }
        if let Some(detector) = &overrides.locale_detector {
            builder = builder.locale_detector(Arc::clone(detector));
        }
        if let Some(translator) = &overrides.translator {
            builder = builder.translator(Arc::clone(translator));
        }

        builder.build(platform)
    }

    /// Builds the manager, syncs commands and starts the cooldown sweeper.
    ///
    /// The runtime is only marked running once the sync succeeded.
    pub async fn start(&self, platform: BoxedPlatform) -> RuntimeResult<CommandManager> {
        let mut running = self.running.write().await;
        if *running {
            warn!("Runtime is already running");
            return Err(RuntimeError::AlreadyRunning);
        }

        info!("Starting Sigil runtime");

        let manager = self.build_manager(platform).await;
        let plan = SyncPlan {
            guild_ids: self.config.commands.guild_ids.clone(),
            delete_orphaned: self.config.commands.delete_orphaned,
        };
        let report = manager.sync(&plan).await.inspect_err(|e| {
            error!(error = %e, "Failed to sync commands, runtime not started");
        })?;

        let period = Duration::from_secs(self.config.commands.cooldown_cleanup_secs);
        let sweeper = Arc::clone(&self.cooldowns).spawn_cleanup(period);
        if let Some(previous) = self.cleanup.lock().await.replace(sweeper) {
            previous.abort();
        }

        *self.manager.write().await = Some(manager.clone());
        *running = true;

        info!(
            registered = report.registered,
            deleted = report.deleted,
            "Runtime started"
        );

        Ok(manager)
    }

    /// Stops the runtime. Interactions dispatched afterwards are rejected.
    pub async fn stop(&self) -> RuntimeResult<()> {
        {
            let mut running = self.running.write().await;
            if !*running {
                warn!("Runtime is not running");
                return Ok(());
            }
            *running = false;
        }

        info!("Stopping Sigil runtime");

        if let Some(sweeper) = self.cleanup.lock().await.take() {
            sweeper.abort();
        }
        self.manager.write().await.take();

        info!("Runtime stopped");

        Ok(())
    }

    /// Dispatches one interaction through the running manager.
    pub async fn dispatch(&self, interaction: Interaction) -> RuntimeResult<DispatchOutcome> {
        let manager = self.manager().await.ok_or(RuntimeError::NotStarted)?;
        Ok(manager.dispatch(interaction).await)
    }

    /// Runs until Ctrl+C, SIGTERM, or the interaction source closes.
    pub async fn run(
        &self,
        platform: BoxedPlatform,
        interactions: mpsc::Receiver<Interaction>,
    ) -> RuntimeResult<()> {
        info!("Sigil runtime is now running. Press Ctrl+C to stop.");
        self.run_until(platform, interactions, Self::wait_for_shutdown())
            .await
    }

    /// Runs until `shutdown` completes or the interaction source closes.
    ///
    /// Each interaction is dispatched on its own task. In-flight dispatches
    /// are awaited before the runtime stops.
    pub async fn run_until<F>(
        &self,
        platform: BoxedPlatform,
        mut interactions: mpsc::Receiver<Interaction>,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let manager = self.start(platform).await?;
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
                received = interactions.recv() => match received {
                    Some(interaction) => {
                        let manager = manager.clone();
                        tasks.spawn(async move { manager.dispatch(interaction).await });
                    }
                    None => {
                        info!("Interaction source closed");
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    reap(joined);
                }
            }
        }

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "Waiting for in-flight dispatches");
        }
        while let Some(joined) = tasks.join_next().await {
            reap(joined);
        }

        self.stop().await
    }

    /// Waits for Ctrl+C or SIGTERM.
    async fn wait_for_shutdown() {
        #[cfg(unix)]
        {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        result = signal::ctrl_c() => on_ctrl_c(result).await,
                        _ = sigterm.recv() => {
                            info!("Received SIGTERM, shutting down");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to register SIGTERM handler, waiting for Ctrl+C only");
                    on_ctrl_c(signal::ctrl_c().await).await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            on_ctrl_c(signal::ctrl_c().await).await;
        }
    }
}

impl Default for SigilRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Without a working Ctrl+C listener the runtime keeps going until the
/// interaction source closes.
async fn on_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

fn reap(joined: Result<DispatchOutcome, tokio::task::JoinError>) {
    match joined {
        Ok(outcome) => debug!(?outcome, "Dispatch task finished"),
        Err(e) => error!(error = %e, "Dispatch task failed"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`SigilRuntime`] with custom configuration sources.
///
/// ```rust,ignore
/// let runtime = SigilRuntime::builder()
///     .config_file("config/sigil.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: SigilConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<SigilRuntime> {
        let config = self.config_loader.load()?;
        Ok(SigilRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
