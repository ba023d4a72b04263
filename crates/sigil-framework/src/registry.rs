//! The resolved command index and the registry holding it.
//!
//! The index maps a resolved key to a command definition. Keys have the form
//! `{platformId}_{name}` for global commands and `g_{guildId}_{platformId}_{name}`
//! for guild commands, and are computed by [`resolved_key`] both when commands
//! are registered and when an interaction is dispatched.
//!
//! The registry never mutates an index in place. A sync builds a fresh index
//! and [`publish`](CommandRegistry::publish)es it; dispatches work on the
//! snapshot they took when they started.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sigil_core::{ApplicationCommand, Snowflake};
use tracing::warn;

use crate::command::Command;

/// Computes the registry key of a platform command.
pub fn resolved_key(guild_id: Option<Snowflake>, command_id: Snowflake, name: &str) -> String {
    match guild_id {
        Some(guild_id) => format!("g_{guild_id}_{command_id}_{name}"),
        None => format!("{command_id}_{name}"),
    }
}

/// Computes the registry key of a platform command descriptor.
pub fn api_command_key(command: &ApplicationCommand) -> String {
    resolved_key(command.guild_id, command.id, &command.name)
}

/// Immutable mapping from resolved key to command definition.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCommandIndex {
    entries: HashMap<String, Command>,
}

impl ResolvedCommandIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a command. A duplicate key keeps the first entry.
    pub fn insert(&mut self, key: String, command: Command) -> bool {
        if self.entries.contains_key(&key) {
            warn!(key = %key, "Duplicate resolved command key, keeping the first entry");
            return false;
        }
        self.entries.insert(key, command);
        true
    }

    /// Moves every entry of `other` into this index.
    pub fn merge(&mut self, other: ResolvedCommandIndex) {
        for (key, command) in other.entries {
            self.insert(key, command);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Command> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Command)> for ResolvedCommandIndex {
    fn from_iter<I: IntoIterator<Item = (String, Command)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (key, command) in iter {
            index.insert(key, command);
        }
        index
    }
}

/// Holds the current index snapshot.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    current: RwLock<Arc<ResolvedCommandIndex>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<ResolvedCommandIndex> {
        Arc::clone(&self.current.read())
    }

    /// Replaces the current snapshot.
    pub fn publish(&self, index: ResolvedCommandIndex) {
        *self.current.write() = Arc::new(index);
    }
}
