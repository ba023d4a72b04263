use std::sync::Arc;

use sigil_core::{Interaction, User};

use super::Scope;
use crate::locale::Translator;
use crate::resolver::ResolvedCommand;

/// Context handed to autocomplete functions.
pub struct AutocompleteContext {
    command: ResolvedCommand,
    interaction: Arc<Interaction>,
    scope: Scope,
    locale: String,
    translator: Arc<dyn Translator>,
    focused: String,
    value: String,
}

impl AutocompleteContext {
    pub(crate) fn new(
        command: ResolvedCommand,
        interaction: Arc<Interaction>,
        scope: Scope,
        locale: String,
        translator: Arc<dyn Translator>,
        focused: String,
        value: String,
    ) -> Self {
        Self {
            command,
            interaction,
            scope,
            locale,
            translator,
            focused,
            value,
        }
    }

    pub fn command(&self) -> &ResolvedCommand {
        &self.command
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn user(&self) -> &User {
        &self.interaction.user
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Name of the option being completed.
    pub fn focused(&self) -> &str {
        &self.focused
    }

    /// What the user typed so far.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn t(&self, key: &str) -> String {
        self.translator.translate(&self.locale, key)
    }
}

impl std::fmt::Debug for AutocompleteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutocompleteContext")
            .field("command", &self.command.resolved_key)
            .field("focused", &self.focused)
            .field("value", &self.value)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}
