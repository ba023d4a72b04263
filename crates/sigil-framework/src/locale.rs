//! Locale detection and translation collaborators.

use async_trait::async_trait;
use sigil_core::{Channel, Guild, Interaction, User};

/// Picks the locale of an invocation.
///
/// `guild` and `channel` are the resolved guild data and are `None` outside a
/// guild. No channel is fetched for direct messages; a detector that needs
/// the DM channel reads `interaction.channel_id`.
#[async_trait]
pub trait LocaleDetector: Send + Sync {
    async fn detect(
        &self,
        interaction: &Interaction,
        user: &User,
        guild: Option<&Guild>,
        channel: Option<&Channel>,
    ) -> String;
}

/// Interaction locale, then guild locale, then a configured default.
#[derive(Debug, Clone)]
pub struct DefaultLocaleDetector {
    default_locale: String,
}

impl DefaultLocaleDetector {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
        }
    }
}

impl Default for DefaultLocaleDetector {
    fn default() -> Self {
        Self::new("en-US")
    }
}

#[async_trait]
impl LocaleDetector for DefaultLocaleDetector {
    async fn detect(
        &self,
        interaction: &Interaction,
        _user: &User,
        guild: Option<&Guild>,
        _channel: Option<&Channel>,
    ) -> String {
        let guild_locale = guild.and(interaction.guild_locale.as_deref());
        interaction
            .locale
            .as_deref()
            .or(guild_locale)
            .filter(|locale| !locale.is_empty())
            .unwrap_or(&self.default_locale)
            .to_string()
    }
}

/// Resolves translation keys for a locale.
pub trait Translator: Send + Sync {
    fn translate(&self, locale: &str, key: &str) -> String;
}

/// Returns every key unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, _locale: &str, key: &str) -> String {
        key.to_string()
    }
}
