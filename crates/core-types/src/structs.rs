use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single closing price on a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    pub date: NaiveDate,
    pub price: Decimal,
}

impl PriceSample {
    pub fn new(date: NaiveDate, price: Decimal) -> Self {
        Self { date, price }
    }
}

/// A date-ordered price history for one stock ticker or token symbol.
///
/// Samples are sorted on construction with a stable sort, so when a provider
/// hands back two samples for the same date the one it listed first stays
/// first. Gaps (weekends, holidays, pre-listing) are normal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut samples: Vec<PriceSample>) -> Self {
        samples.sort_by_key(|s| s.date);
        Self {
            symbol: symbol.into(),
            samples,
        }
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Vec::new())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn samples(&self) -> &[PriceSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when more than one sample carries `date`.
    pub fn is_duplicated(&self, date: NaiveDate) -> bool {
        let lo = self.samples.partition_point(|s| s.date < date);
        let hi = self.samples.partition_point(|s| s.date <= date);
        hi - lo > 1
    }

    /// A copy restricted to `start..=end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        let lo = self.samples.partition_point(|s| s.date < start);
        let hi = self.samples.partition_point(|s| s.date <= end);
        let samples = if lo < hi {
            self.samples[lo..hi].to_vec()
        } else {
            Vec::new()
        };
        PriceSeries {
            symbol: self.symbol.clone(),
            samples,
        }
    }
}
