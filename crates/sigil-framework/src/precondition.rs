//! The precondition gate.
//!
//! Preconditions run after resolution and before any guild data is fetched.
//! A check answers `Ok(true)` to let the dispatch continue, `Ok(false)` to
//! skip it silently, or `Err` for a hard failure that is reported to the user.
//!
//! The gate runs its checks in a fixed order and stops at the first one that
//! does not pass:
//! 1. developer-only
//! 2. required application permissions
//! 3. custom preconditions, in registration order
//! 4. cooldowns (started only when every other check passed)

use std::collections::HashSet;
use std::iter;
use std::sync::Arc;

use async_trait::async_trait;
use sigil_core::{DiagnosticError, ErrorKind, Interaction, Permissions, Platform, Snowflake};
use tracing::trace;

use crate::command::{CommandOptions, command_display};
use crate::cooldown::CooldownManager;
use crate::resolver::ResolvedCommand;

/// Everything a precondition may look at.
pub struct PreconditionRequest<'a> {
    pub command: &'a ResolvedCommand,
    pub platform: &'a dyn Platform,
    pub interaction: &'a Interaction,
}

impl PreconditionRequest<'_> {
    /// Precondition options of the resolved command.
    pub fn options(&self) -> &CommandOptions {
        self.command.command.options()
    }
}

/// A check run before context construction.
#[async_trait]
pub trait Precondition: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn check(&self, request: &PreconditionRequest<'_>) -> Result<bool, DiagnosticError>;
}

// ============================================================================
// Built-ins
// ============================================================================

/// Restricts `developer_only` commands to the configured developers.
#[derive(Debug, Clone, Default)]
pub struct DeveloperOnly {
    developers: HashSet<Snowflake>,
}

impl DeveloperOnly {
    pub fn new(developers: impl IntoIterator<Item = Snowflake>) -> Self {
        Self {
            developers: developers.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Precondition for DeveloperOnly {
    fn name(&self) -> &str {
        "developer_only"
    }

    async fn check(&self, request: &PreconditionRequest<'_>) -> Result<bool, DiagnosticError> {
        if !request.options().developer_only {
            return Ok(true);
        }
        Ok(self.developers.contains(&request.interaction.user.id))
    }
}

/// Checks the application's permissions in the invoking channel.
///
/// Interactions without permission data (direct messages) pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredPermissions;

#[async_trait]
impl Precondition for RequiredPermissions {
    fn name(&self) -> &str {
        "required_permissions"
    }

    async fn check(&self, request: &PreconditionRequest<'_>) -> Result<bool, DiagnosticError> {
        let required = request.options().required_permissions;
        let Some(granted) = request.interaction.app_permissions else {
            return Ok(true);
        };
        if granted.contains(Permissions::ADMINISTRATOR) {
            return Ok(true);
        }

        let missing = granted.missing(required);
        if !missing.is_empty() {
            trace!(?missing, "Application is missing permissions");
            return Ok(false);
        }
        Ok(true)
    }
}

/// Enforces and starts command cooldowns.
#[derive(Debug, Clone, Default)]
pub struct Cooldowns {
    manager: Arc<CooldownManager>,
}

impl Cooldowns {
    pub fn new(manager: Arc<CooldownManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Precondition for Cooldowns {
    fn name(&self) -> &str {
        "cooldown"
    }

    async fn check(&self, request: &PreconditionRequest<'_>) -> Result<bool, DiagnosticError> {
        let Some(config) = request.options().cooldown else {
            return Ok(true);
        };
        let command = command_display(request.interaction);
        let user_id = request.interaction.user.id;
        let channel_id = request.interaction.channel_id;

        if let Err(err) = self.manager.try_acquire(&command, user_id, channel_id, &config) {
            trace!(error = %err, "Command is on cooldown");
            return Ok(false);
        }
        Ok(true)
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Runs the built-in and custom preconditions in order.
#[derive(Default)]
pub struct PreconditionGate {
    developer: DeveloperOnly,
    permissions: RequiredPermissions,
    custom: Vec<Arc<dyn Precondition>>,
    cooldowns: Cooldowns,
}

impl PreconditionGate {
    pub fn new(developers: impl IntoIterator<Item = Snowflake>) -> Self {
        Self {
            developer: DeveloperOnly::new(developers),
            ..Self::default()
        }
    }

    /// Uses a shared cooldown manager instead of a private one.
    pub fn with_cooldowns(mut self, manager: Arc<CooldownManager>) -> Self {
        self.cooldowns = Cooldowns::new(manager);
        self
    }

    /// Appends a custom precondition.
    pub fn push(&mut self, precondition: Arc<dyn Precondition>) {
        self.custom.push(precondition);
    }

    pub fn cooldown_manager(&self) -> &Arc<CooldownManager> {
        &self.cooldowns.manager
    }

    /// Runs every check. `Ok(false)` means the dispatch is skipped.
    pub async fn check(&self, request: &PreconditionRequest<'_>) -> Result<bool, DiagnosticError> {
        let builtins: [&dyn Precondition; 2] = [&self.developer, &self.permissions];
        let custom = self.custom.iter().map(|p| p.as_ref() as &dyn Precondition);
        let chain = builtins
            .into_iter()
            .chain(custom)
            .chain(iter::once(&self.cooldowns as &dyn Precondition));

        for precondition in chain {
            match precondition.check(request).await {
                Ok(true) => {}
                Ok(false) => {
                    trace!(
                        precondition = precondition.name(),
                        command = %request.command.resolved_key,
                        "Precondition not met, skipping dispatch"
                    );
                    return Ok(false);
                }
                Err(err) => {
                    return Err(err
                        .with_kind(ErrorKind::Precondition)
                        .with_debug("precondition", precondition.name()));
                }
            }
        }
        Ok(true)
    }
}

impl std::fmt::Debug for PreconditionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreconditionGate")
            .field("developers", &self.developer.developers.len())
            .field("custom_count", &self.custom.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::command::{CommandHandler, SlashBuild};
    use crate::cooldown::CooldownConfig;
    use crate::testing::{InteractionFixture, MockPlatform};

    fn resolved(handler: CommandHandler) -> ResolvedCommand {
        ResolvedCommand {
            command: Arc::new(handler),
            resolved_key: "1_test".into(),
        }
    }

    fn handler() -> CommandHandler {
        CommandHandler::new(SlashBuild::new("test", "test"), |ctx| async move { ctx.ok() })
    }

    struct Counting {
        answer: Result<bool, DiagnosticError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Precondition for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn check(&self, _request: &PreconditionRequest<'_>) -> Result<bool, DiagnosticError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    #[tokio::test]
    async fn test_developer_only() {
        let platform = MockPlatform::new();
        let gate = PreconditionGate::new([42]);
        let command = resolved(handler().developer_only());

        let stranger = InteractionFixture::slash("test", 1).user(7).build();
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &stranger,
        };
        assert!(!gate.check(&request).await.unwrap());

        let developer = InteractionFixture::slash("test", 1).user(42).build();
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &developer,
        };
        assert!(gate.check(&request).await.unwrap());
    }

    #[tokio::test]
    async fn test_permissions() {
        let platform = MockPlatform::new();
        let gate = PreconditionGate::default();
        let command = resolved(handler().require_permissions(Permissions::MANAGE_MESSAGES));

        let mut interaction = InteractionFixture::slash("test", 1).build();
        interaction.app_permissions = Some(Permissions::SEND_MESSAGES);
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &interaction,
        };
        assert!(!gate.check(&request).await.unwrap());

        let mut admin = interaction.clone();
        admin.app_permissions = Some(Permissions::ADMINISTRATOR);
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &admin,
        };
        assert!(gate.check(&request).await.unwrap());

        let mut dm = interaction.clone();
        dm.app_permissions = None;
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &dm,
        };
        assert!(gate.check(&request).await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_error_is_precondition_kind() {
        let platform = MockPlatform::new();
        let mut gate = PreconditionGate::default();
        gate.push(Arc::new(Counting {
            answer: Err(DiagnosticError::internal("database down")),
            calls: AtomicUsize::new(0),
        }));

        let command = resolved(handler());
        let interaction = InteractionFixture::slash("test", 1).build();
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &interaction,
        };
        let err = gate.check(&request).await.unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Precondition);
        assert_eq!(err.debugs().get("precondition"), Some(&serde_json::Value::from("counting")));
    }

    #[tokio::test]
    async fn test_skip_short_circuits_later_checks() {
        let platform = MockPlatform::new();
        let first = Arc::new(Counting {
            answer: Ok(false),
            calls: AtomicUsize::new(0),
        });
        let second = Arc::new(Counting {
            answer: Ok(true),
            calls: AtomicUsize::new(0),
        });
        let mut gate = PreconditionGate::default();
        gate.push(first.clone());
        gate.push(second.clone());

        let command = resolved(handler().cooldown(CooldownConfig::per_user(Duration::from_secs(60))));
        let interaction = InteractionFixture::slash("test", 1).build();
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &interaction,
        };

        assert!(!gate.check(&request).await.unwrap());
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert_eq!(gate.cooldown_manager().active(), 0);
    }

    #[tokio::test]
    async fn test_cooldown_applies_on_pass() {
        let platform = MockPlatform::new();
        let gate = PreconditionGate::default();
        let command = resolved(handler().cooldown(CooldownConfig::per_user(Duration::from_secs(60))));
        let interaction = InteractionFixture::slash("test", 1).build();
        let request = PreconditionRequest {
            command: &command,
            platform: &platform,
            interaction: &interaction,
        };

        assert!(gate.check(&request).await.unwrap());
        assert!(!gate.check(&request).await.unwrap());
    }
}
