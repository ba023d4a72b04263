//! Per-user, per-channel and global command cooldowns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use sigil_core::Snowflake;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Raised when a command is still cooling down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CooldownError {
    #[error("user {user_id} is on cooldown for '{command}' ({remaining:?} left)")]
    User {
        user_id: Snowflake,
        command: String,
        remaining: Duration,
    },
    #[error("channel {channel_id} is on cooldown for '{command}' ({remaining:?} left)")]
    Channel {
        channel_id: Snowflake,
        command: String,
        remaining: Duration,
    },
    #[error("'{command}' is on global cooldown ({remaining:?} left)")]
    Global { command: String, remaining: Duration },
}

impl CooldownError {
    pub fn remaining(&self) -> Duration {
        match self {
            Self::User { remaining, .. }
            | Self::Channel { remaining, .. }
            | Self::Global { remaining, .. } => *remaining,
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CooldownKey {
    User(String, Snowflake),
    Channel(String, Snowflake),
    Global(String),
}

impl CooldownKey {
    fn command(&self) -> &str {
        match self {
            Self::User(cmd, _) | Self::Channel(cmd, _) | Self::Global(cmd) => cmd,
        }
    }
}

/// Cooldown durations of a command. Unset scopes are not limited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownConfig {
    pub user: Option<Duration>,
    pub channel: Option<Duration>,
    pub global: Option<Duration>,
}

impl CooldownConfig {
    pub fn per_user(duration: Duration) -> Self {
        Self {
            user: Some(duration),
            ..Self::default()
        }
    }

    pub fn per_channel(duration: Duration) -> Self {
        Self {
            channel: Some(duration),
            ..Self::default()
        }
    }

    pub fn global(duration: Duration) -> Self {
        Self {
            global: Some(duration),
            ..Self::default()
        }
    }

    fn longest(&self) -> Duration {
        [self.user, self.channel, self.global]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or_default()
    }
}

/// Tracks when each command was last used.
#[derive(Debug, Default)]
pub struct CooldownManager {
    /// Last use and the duration it blocks for.
    cooldowns: DashMap<CooldownKey, (Instant, Duration)>,
    /// Held across check and apply in [`try_acquire`](Self::try_acquire).
    acquire: Mutex<()>,
}

impl CooldownManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn remaining(&self, key: &CooldownKey, now: Instant) -> Option<Duration> {
        let entry = self.cooldowns.get(key)?;
        let (last_used, duration) = *entry.value();
        let elapsed = now.saturating_duration_since(last_used);
        (elapsed < duration).then(|| duration - elapsed)
    }

    /// Checks every configured scope, global first.
    pub fn check(
        &self,
        command: &str,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
        config: &CooldownConfig,
    ) -> Result<(), CooldownError> {
        let now = Instant::now();

        if config.global.is_some() {
            if let Some(remaining) = self.remaining(&CooldownKey::Global(command.to_string()), now) {
                return Err(CooldownError::Global {
                    command: command.to_string(),
                    remaining,
                });
            }
        }

        if let (Some(_), Some(channel_id)) = (config.channel, channel_id) {
            let key = CooldownKey::Channel(command.to_string(), channel_id);
            if let Some(remaining) = self.remaining(&key, now) {
                return Err(CooldownError::Channel {
                    channel_id,
                    command: command.to_string(),
                    remaining,
                });
            }
        }

        if config.user.is_some() {
            let key = CooldownKey::User(command.to_string(), user_id);
            if let Some(remaining) = self.remaining(&key, now) {
                return Err(CooldownError::User {
                    user_id,
                    command: command.to_string(),
                    remaining,
                });
            }
        }

        Ok(())
    }

    /// Starts the configured cooldowns for one use of `command`.
    pub fn apply(
        &self,
        command: &str,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
        config: &CooldownConfig,
    ) {
        let now = Instant::now();

        if let Some(duration) = config.global {
            self.cooldowns
                .insert(CooldownKey::Global(command.to_string()), (now, duration));
        }
        if let (Some(duration), Some(channel_id)) = (config.channel, channel_id) {
            self.cooldowns.insert(
                CooldownKey::Channel(command.to_string(), channel_id),
                (now, duration),
            );
        }
        if let Some(duration) = config.user {
            self.cooldowns
                .insert(CooldownKey::User(command.to_string(), user_id), (now, duration));
        }

        trace!(command, user_id, longest = ?config.longest(), "Applied cooldowns");
    }

    /// Checks and, if nothing blocks, applies in one step. Of several
    /// concurrent callers for the same scope, at most one succeeds.
    pub fn try_acquire(
        &self,
        command: &str,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
        config: &CooldownConfig,
    ) -> Result<(), CooldownError> {
        let _guard = self.acquire.lock();
        self.check(command, user_id, channel_id, config)?;
        self.apply(command, user_id, channel_id, config);
        Ok(())
    }

    /// Clears all cooldowns of a command.
    pub fn clear_command(&self, command: &str) {
        self.cooldowns.retain(|key, _| key.command() != command);
        debug!(command, "Cleared command cooldowns");
    }

    /// Clears all per-user cooldowns of a user.
    pub fn clear_user(&self, user_id: Snowflake) {
        self.cooldowns
            .retain(|key, _| !matches!(key, CooldownKey::User(_, uid) if *uid == user_id));
        debug!(user_id, "Cleared user cooldowns");
    }

    /// Number of tracked entries, expired ones included.
    pub fn active(&self) -> usize {
        self.cooldowns.len()
    }

    /// Drops every expired entry.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let before = self.cooldowns.len();
        self.cooldowns
            .retain(|_, (last_used, duration)| now.saturating_duration_since(*last_used) < *duration);
        trace!(removed = before.saturating_sub(self.cooldowns.len()), "Cleaned up expired cooldowns");
    }

    /// Spawns a task running [`cleanup_expired`](Self::cleanup_expired) every `period`.
    pub fn spawn_cleanup(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.cleanup_expired();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[test]
    fn test_user_cooldown() {
        let manager = CooldownManager::new();
        let config = CooldownConfig::per_user(Duration::from_secs(60));

        assert_ok!(manager.check("ping", 1, None, &config));
        manager.apply("ping", 1, None, &config);

        let err = manager.check("ping", 1, None, &config).unwrap_err();
        assert!(matches!(err, CooldownError::User { user_id: 1, .. }));
        assert!(err.remaining() <= Duration::from_secs(60));

        assert_ok!(manager.check("ping", 2, None, &config));
        assert_ok!(manager.check("pong", 1, None, &config));
    }

    #[test]
    fn test_channel_and_global() {
        let manager = CooldownManager::new();
        let channel = CooldownConfig::per_channel(Duration::from_secs(60));
        manager.apply("roll", 1, Some(10), &channel);
        assert!(matches!(
            manager.check("roll", 2, Some(10), &channel),
            Err(CooldownError::Channel { channel_id: 10, .. })
        ));
        assert_ok!(manager.check("roll", 2, Some(11), &channel));
        assert_ok!(manager.check("roll", 2, None, &channel));

        let global = CooldownConfig::global(Duration::from_secs(60));
        manager.apply("daily", 1, None, &global);
        assert!(matches!(
            manager.check("daily", 5, Some(3), &global),
            Err(CooldownError::Global { .. })
        ));
    }

    #[test]
    fn test_zero_duration_never_blocks() {
        let manager = CooldownManager::new();
        let config = CooldownConfig::per_user(Duration::ZERO);
        manager.apply("ping", 1, None, &config);
        assert_ok!(manager.check("ping", 1, None, &config));

        manager.cleanup_expired();
        assert_eq!(manager.active(), 0);
    }

    #[test]
    fn test_concurrent_acquire_admits_one() {
        let manager = Arc::new(CooldownManager::new());
        let config = CooldownConfig::per_user(Duration::from_secs(60));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    manager.try_acquire("daily", 1, None, &config).is_ok()
                })
            })
            .collect();
        let admitted = workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(manager.active(), 1);
    }

    #[test]
    fn test_clear() {
        let manager = CooldownManager::new();
        let config = CooldownConfig {
            user: Some(Duration::from_secs(60)),
            channel: Some(Duration::from_secs(60)),
            global: None,
        };
        manager.apply("a", 1, Some(2), &config);
        manager.apply("b", 1, Some(2), &config);
        assert_eq!(manager.active(), 4);

        manager.clear_user(1);
        assert_eq!(manager.active(), 2);
        manager.clear_command("a");
        assert_eq!(manager.active(), 1);
    }
}
