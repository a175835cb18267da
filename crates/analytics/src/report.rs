use chrono::NaiveDate;
use core_types::{DataWarning, MetricKind};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// The performance of one instrument around one anchor date.
///
/// This struct is the output of the `PerformanceCalculator`. Each metric maps
/// to `None` when either of its endpoints could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub symbol: String,
    pub anchor: NaiveDate,
    /// The price resolved on or before the anchor.
    pub anchor_price: Option<Decimal>,
    /// Percentage changes, scaled by 100 and rounded to two places.
    pub metrics: BTreeMap<MetricKind, Option<Decimal>>,
    /// Integrity faults met along the way, sorted and de-duplicated.
    pub warnings: Vec<DataWarning>,
}

impl PerformanceReport {
    pub fn new(symbol: impl Into<String>, anchor: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            anchor,
            anchor_price: None,
            metrics: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn metric(&self, kind: MetricKind) -> Option<Decimal> {
        self.metrics.get(&kind).copied().flatten()
    }
}
