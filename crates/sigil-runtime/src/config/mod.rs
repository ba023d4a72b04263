//! Runtime configuration: schema, figment loader and validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    CommandsConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, MessagesConfig,
    SigilConfig, SpanEventConfig,
};
pub use validation::validate_config;

impl SigilConfig {
    /// Loads from the default locations with environment overrides.
    pub fn load() -> ConfigResult<Self> {
        ConfigLoader::new().load()
    }

    /// Loads a single file with environment overrides.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        ConfigLoader::new().file(path).load()
    }
}
