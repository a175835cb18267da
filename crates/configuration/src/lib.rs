//! # datwatch Configuration
//!
//! Strongly-typed settings layered from an optional `config.toml`, `DATWATCH__*`
//! environment variables and command-line overrides, plus the tracing setup.

use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod overrides;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use overrides::Overrides;
pub use settings::{DedupeSettings, EnrichmentSettings, LoggingSettings, PriceSettings, Settings};

/// The file `load_config` looks for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Loads the application configuration from `config.toml` and the environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Loads the configuration from `path` (which may be absent) and the environment.
///
/// Environment variables use the `DATWATCH` prefix and `__` between levels,
/// e.g. `DATWATCH__ENRICHMENT__WORKER_LIMIT=4`.
pub fn load_config_from(path: &Path) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("DATWATCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    tracing::debug!(file = %path.display(), "Configuration loaded.");
    Ok(settings)
}
