use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a target date a price sample may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    OnOrBefore,
    OnOrAfter,
}

/// The two instruments a DAT event is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetClass {
    Stock,
    Token,
}

impl AssetClass {
    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::Stock => "Stock",
            AssetClass::Token => "Token",
        }
    }

    /// Record key holding the price resolved on the anchor date.
    pub fn anchor_price_field(&self) -> &'static str {
        match self {
            AssetClass::Stock => "Share Price on Ann. Date",
            AssetClass::Token => "Token Price on Ann. Date",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named performance window, measured in calendar days from the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKind {
    /// D-1 -> D
    DayOf,
    /// D -> D+1
    OneDay,
    /// D -> D+7
    SevenDay,
    /// D -> D+30, stock only
    ThirtyDay,
    /// D-7 -> D
    MinusSevenDay,
    /// D-7 -> D-1
    MinusSevenToMinusOne,
    /// D-30 -> D-1, stock only
    MinusThirtyToMinusOne,
}

const STOCK_METRICS: [MetricKind; 7] = [
    MetricKind::DayOf,
    MetricKind::OneDay,
    MetricKind::SevenDay,
    MetricKind::ThirtyDay,
    MetricKind::MinusSevenDay,
    MetricKind::MinusSevenToMinusOne,
    MetricKind::MinusThirtyToMinusOne,
];

// Token metrics deliberately stop at seven days in either direction.
const TOKEN_METRICS: [MetricKind; 5] = [
    MetricKind::DayOf,
    MetricKind::OneDay,
    MetricKind::SevenDay,
    MetricKind::MinusSevenDay,
    MetricKind::MinusSevenToMinusOne,
];

impl MetricKind {
    /// The metrics reported for an asset class.
    pub fn for_asset(asset: AssetClass) -> &'static [MetricKind] {
        match asset {
            AssetClass::Stock => &STOCK_METRICS,
            AssetClass::Token => &TOKEN_METRICS,
        }
    }

    /// Start and end offsets in calendar days relative to the anchor.
    pub fn offsets(&self) -> (i64, i64) {
        match self {
            MetricKind::DayOf => (-1, 0),
            MetricKind::OneDay => (0, 1),
            MetricKind::SevenDay => (0, 7),
            MetricKind::ThirtyDay => (0, 30),
            MetricKind::MinusSevenDay => (-7, 0),
            MetricKind::MinusSevenToMinusOne => (-7, -1),
            MetricKind::MinusThirtyToMinusOne => (-30, -1),
        }
    }

    /// Resolution direction for the start and end endpoints.
    ///
    /// Forward-looking windows resolve their end on or after the target so a
    /// weekend `D+1` lands on the next session; everything else looks back.
    pub fn directions(&self) -> (Direction, Direction) {
        match self {
            MetricKind::OneDay | MetricKind::SevenDay | MetricKind::ThirtyDay => {
                (Direction::OnOrBefore, Direction::OnOrAfter)
            }
            MetricKind::DayOf
            | MetricKind::MinusSevenDay
            | MetricKind::MinusSevenToMinusOne
            | MetricKind::MinusThirtyToMinusOne => (Direction::OnOrBefore, Direction::OnOrBefore),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::DayOf => "D",
            MetricKind::OneDay => "1D",
            MetricKind::SevenDay => "7D",
            MetricKind::ThirtyDay => "30D",
            MetricKind::MinusSevenDay => "-7D",
            MetricKind::MinusSevenToMinusOne => "-7 to -1D",
            MetricKind::MinusThirtyToMinusOne => "-30D",
        }
    }

    /// The record key this metric is written under, e.g. `"1D Stock Perf"`.
    pub fn field_name(&self, asset: AssetClass) -> String {
        match self {
            MetricKind::MinusThirtyToMinusOne => {
                format!("{} {} Perf (to D-1)", self.label(), asset.label())
            }
            _ => format!("{} {} Perf", self.label(), asset.label()),
        }
    }
}

/// How a duplicate group picks its canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResolutionPolicy {
    #[default]
    KeepLargest,
    KeepFirst,
    KeepLast,
    MostFilled,
}

impl ResolutionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPolicy::KeepLargest => "largest",
            ResolutionPolicy::KeepFirst => "first",
            ResolutionPolicy::KeepLast => "last",
            ResolutionPolicy::MostFilled => "most_filled",
        }
    }
}

impl FromStr for ResolutionPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "largest" => Ok(ResolutionPolicy::KeepLargest),
            "first" => Ok(ResolutionPolicy::KeepFirst),
            "last" => Ok(ResolutionPolicy::KeepLast),
            "most_filled" | "most-filled" => Ok(ResolutionPolicy::MostFilled),
            _ => Err(CoreError::UnknownVariant {
                kind: "resolution policy",
                value: s.to_string(),
                expected: "largest, first, last, most_filled",
            }),
        }
    }
}

impl TryFrom<String> for ResolutionPolicy {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResolutionPolicy> for String {
    fn from(value: ResolutionPolicy) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which asset classes an enrichment pass computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnrichmentMode {
    StockOnly,
    TokenOnly,
    #[default]
    Both,
}

impl EnrichmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentMode::StockOnly => "stock-only",
            EnrichmentMode::TokenOnly => "token-only",
            EnrichmentMode::Both => "both",
        }
    }

    pub fn includes(&self, asset: AssetClass) -> bool {
        matches!(
            (self, asset),
            (EnrichmentMode::Both, _)
                | (EnrichmentMode::StockOnly, AssetClass::Stock)
                | (EnrichmentMode::TokenOnly, AssetClass::Token)
        )
    }
}

impl FromStr for EnrichmentMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock-only" | "stock_only" => Ok(EnrichmentMode::StockOnly),
            "token-only" | "token_only" => Ok(EnrichmentMode::TokenOnly),
            "both" => Ok(EnrichmentMode::Both),
            _ => Err(CoreError::UnknownVariant {
                kind: "enrichment mode",
                value: s.to_string(),
                expected: "stock-only, token-only, both",
            }),
        }
    }
}

impl TryFrom<String> for EnrichmentMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnrichmentMode> for String {
    fn from(value: EnrichmentMode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EnrichmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What token enrichment anchors on when the record carries no announcement date.
///
/// Stock enrichment has no fallback: without an explicit date it is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TokenAnchorFallback {
    /// The day before the processing date.
    #[default]
    Yesterday,
    /// Leave token metrics uncomputed.
    Skip,
}

impl TokenAnchorFallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenAnchorFallback::Yesterday => "yesterday",
            TokenAnchorFallback::Skip => "skip",
        }
    }
}

impl FromStr for TokenAnchorFallback {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yesterday" => Ok(TokenAnchorFallback::Yesterday),
            "skip" => Ok(TokenAnchorFallback::Skip),
            _ => Err(CoreError::UnknownVariant {
                kind: "token anchor fallback",
                value: s.to_string(),
                expected: "yesterday, skip",
            }),
        }
    }
}

impl TryFrom<String> for TokenAnchorFallback {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenAnchorFallback> for String {
    fn from(value: TokenAnchorFallback) -> Self {
        value.as_str().to_string()
    }
}

/// How computed fields are merged into a record that already has values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MergePolicy {
    /// Only write where the record has nothing, `N/A` or `Not Applicable`.
    #[default]
    FillEmpty,
    Overwrite,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::FillEmpty => "fill-empty",
            MergePolicy::Overwrite => "overwrite",
        }
    }
}

impl FromStr for MergePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fill-empty" | "fill_empty" => Ok(MergePolicy::FillEmpty),
            "overwrite" => Ok(MergePolicy::Overwrite),
            _ => Err(CoreError::UnknownVariant {
                kind: "merge policy",
                value: s.to_string(),
                expected: "fill-empty, overwrite",
            }),
        }
    }
}

impl TryFrom<String> for MergePolicy {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MergePolicy> for String {
    fn from(value: MergePolicy) -> Self {
        value.as_str().to_string()
    }
}
