//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML files (`sigil.toml`, `config.toml`)
//! - `yaml-config`: enables YAML files (`sigil.yaml`, `sigil.yml`)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`sigil.{profile}.toml`)
//! 4. Main config file (`sigil.toml`)
//! 5. Environment variables (`SIGIL_*`)
//!
//! # Environment Variable Mapping
//!
//! Keys use the `SIGIL_` prefix with `__` as the nesting separator:
//!
//! - `SIGIL_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SIGIL_COMMANDS__DELETE_ORPHANED=true` → `commands.delete_orphaned = true`
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/sigil.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SigilConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "SIGIL_";
const PROFILE_VAR: &str = "SIGIL_PROFILE";
const CONFIG_DIR_NAME: &str = "sigil";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting the `dev` and `prod` shorthands.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `SIGIL_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-source configuration loader.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory searched for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(CONFIG_DIR_NAME)),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers a programmatic configuration over the defaults.
    pub fn merge(mut self, config: SigilConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<SigilConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: SigilConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(format!("Failed to extract configuration: {e}")))?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            guilds = config.commands.guild_ids.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SigilConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.figment));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment)
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join(CONFIG_DIR_NAME));
        }
        paths
    }

    /// Walks `search_paths × base_names`. A profile variant is merged before
    /// its base file; the first base file found ends the search.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return (merge_fn(figment, &base_path), true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["sigil.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["sigil.yaml", "sigil.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, LoggingConfig};

    fn empty_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sigil-loader-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let dir = empty_dir("defaults");
        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config, SigilConfig::default());
        assert_eq!(config.commands.default_locale, "en-US");
        assert_eq!(config.commands.cooldown_cleanup_secs, 60);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Development"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let dir = empty_dir("merge");
        let config = ConfigLoader::new()
            .search_path(&dir)
            .without_env()
            .merge(SigilConfig {
                logging: LoggingConfig {
                    level: LogLevel::Debug,
                    ..Default::default()
                },
                ..Default::default()
            })
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/definitely/not/here/sigil.toml")
            .without_env()
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_with_profile() {
        let dir = empty_dir("toml");
        std::fs::write(
            dir.join("sigil.toml"),
            "[commands]\nguild_ids = [5, 6]\ndelete_orphaned = true\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("sigil.production.toml"),
            "[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .profile("production")
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.commands.guild_ids, vec![5, 6]);
        assert!(config.commands.delete_orphaned);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_file_fails_validation() {
        let dir = empty_dir("invalid");
        let path = dir.join("sigil.toml");
        std::fs::write(&path, "[commands]\nguild_ids = [5, 5]\n").unwrap();

        let err = ConfigLoader::new()
            .file(&path)
            .without_env()
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::DuplicateGuildId(5)));
    }
}
