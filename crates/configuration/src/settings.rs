use crate::error::ConfigError;
use core_types::{EnrichmentMode, MergePolicy, ResolutionPolicy, TokenAnchorFallback};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an absent `config.toml` is not an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub enrichment: EnrichmentSettings,
    pub dedupe: DedupeSettings,
    pub prices: PriceSettings,
    pub logging: LoggingSettings,
}

/// Parameters for a price-performance enrichment pass.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentSettings {
    /// `stock-only`, `token-only` or `both`.
    pub mode: EnrichmentMode,
    /// Upper bound on records enriched concurrently. Must be at least 1.
    pub worker_limit: usize,
    /// What token metrics anchor on when a record has no announcement date.
    pub token_anchor_fallback: TokenAnchorFallback,
    pub merge: MergePolicy,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            mode: EnrichmentMode::Both,
            worker_limit: 10,
            token_anchor_fallback: TokenAnchorFallback::Yesterday,
            merge: MergePolicy::FillEmpty,
        }
    }
}

/// Parameters for duplicate resolution and the trash step that follows it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupeSettings {
    /// `largest`, `first`, `last` or `most_filled`.
    pub policy: ResolutionPolicy,
    /// Only merge records whose ticker, token and date are all present.
    pub require_complete_key: bool,
    /// Also move sibling files sharing a discarded card's stem.
    pub include_related: bool,
    /// Sub-directory discarded cards are moved into.
    pub trash_dir_name: String,
}

impl Default for DedupeSettings {
    fn default() -> Self {
        Self {
            policy: ResolutionPolicy::KeepLargest,
            require_complete_key: false,
            include_related: true,
            trash_dir_name: "_dedup_trash".to_string(),
        }
    }
}

/// Where historical prices are read from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceSettings {
    /// Directory holding one `<SYMBOL>.json` series per instrument.
    pub dir: PathBuf,
    /// Token symbol to price-file symbol, e.g. `BTC = "BTC-USD"`. Entries
    /// from a config file extend the built-in map.
    #[serde(deserialize_with = "merge_token_aliases")]
    pub token_aliases: BTreeMap<String, String>,
}

impl PriceSettings {
    /// The price-file symbol for a token. Lookup ignores key case.
    pub fn token_file_symbol(&self, token: &str) -> String {
        self.token_aliases
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(token))
            .map_or_else(|| token.to_uppercase(), |(_, v)| v.clone())
    }
}

fn default_token_aliases() -> BTreeMap<String, String> {
    [
        "BTC", "ETH", "SOL", "BNB", "XRP", "TON", "AVAX", "DOGE", "ADA", "TRX", "SUI", "FET",
        "TAO", "BONK",
    ]
    .into_iter()
    .map(|t| (t.to_string(), format!("{t}-USD")))
    .collect()
}

/// Configured aliases win over built-in ones. Keys are upper-cased so a
/// lower-cased config key still replaces its default.
fn merge_token_aliases<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let configured = BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut aliases = default_token_aliases();
    aliases.extend(configured.into_iter().map(|(k, v)| (k.to_uppercase(), v)));
    Ok(aliases)
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("prices"),
            token_aliases: default_token_aliases(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs also go to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Settings {
    /// Rejects values no run could sensibly use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enrichment.worker_limit == 0 {
            return Err(ConfigError::ValidationError(
                "enrichment.worker_limit must be at least 1".to_string(),
            ));
        }
        let trash = self.dedupe.trash_dir_name.trim();
        if trash.is_empty() || trash.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "dedupe.trash_dir_name must be a plain directory name, got {:?}",
                self.dedupe.trash_dir_name
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}
