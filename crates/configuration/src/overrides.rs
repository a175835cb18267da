use crate::error::ConfigError;
use crate::settings::Settings;
use std::path::PathBuf;

/// Command-line values that take precedence over the file and environment.
///
/// Mode and policy stay strings until `apply`, so an unknown value fails with
/// the list of accepted spellings.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct Overrides {
    /// Enrichment mode: both, stock-only or token-only.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub mode: Option<String>,

    /// Duplicate resolution policy: largest, first, last or most_filled.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub policy: Option<String>,

    /// Maximum number of records enriched concurrently.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub workers: Option<usize>,

    /// Directory holding `<SYMBOL>.json` price files.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub prices: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "enricher=trace".
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub log_level: Option<String>,
}

impl Overrides {
    /// Layers the overrides onto `settings` and re-validates the result.
    pub fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        if let Some(mode) = &self.mode {
            settings.enrichment.mode = mode.parse()?;
        }
        if let Some(policy) = &self.policy {
            settings.dedupe.policy = policy.parse()?;
        }
        if let Some(workers) = self.workers {
            settings.enrichment.worker_limit = workers;
        }
        if let Some(dir) = &self.prices {
            settings.prices.dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = level.clone();
        }
        settings.validate()
    }
}
