use crate::align::resolve;
use crate::report::PerformanceReport;
use chrono::{Duration, NaiveDate};
use core_types::{AssetClass, DataWarning, Direction, MetricKind, PriceSample, PriceSeries};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::BTreeSet;

/// Decimal places kept on percentage values.
pub const PERCENT_SCALE: u32 = 2;

/// A stateless calculator for price performance around an anchor date.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerformanceCalculator {}

impl PerformanceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes every metric defined for `asset` against `series`.
    ///
    /// # Arguments
    ///
    /// * `anchor` - The announcement date that all offsets are measured from.
    /// * `series` - The instrument's price history; never mutated.
    /// * `asset` - Selects the metric subset (tokens have no 30-day windows).
    ///
    /// Identical inputs always produce an identical report.
    pub fn compute(&self, anchor: NaiveDate, series: &PriceSeries, asset: AssetClass) -> PerformanceReport {
        self.compute_metrics(anchor, series, MetricKind::for_asset(asset))
    }

    /// Computes an explicit list of metrics.
    pub fn compute_metrics(
        &self,
        anchor: NaiveDate,
        series: &PriceSeries,
        metrics: &[MetricKind],
    ) -> PerformanceReport {
        let mut report = PerformanceReport::new(series.symbol(), anchor);
        let mut warnings = BTreeSet::new();

        report.anchor_price = self
            .endpoint(series, Some(anchor), Direction::OnOrBefore, &mut warnings)
            .map(|s| s.price);

        for &kind in metrics {
            let value = self.compute_metric(anchor, series, kind, &mut warnings);
            tracing::debug!(
                symbol = series.symbol(),
                %anchor,
                metric = kind.label(),
                value = ?value,
                "Computed metric."
            );
            report.metrics.insert(kind, value);
        }

        report.warnings = warnings.into_iter().collect();
        report
    }

    fn compute_metric(
        &self,
        anchor: NaiveDate,
        series: &PriceSeries,
        kind: MetricKind,
        warnings: &mut BTreeSet<DataWarning>,
    ) -> Option<Decimal> {
        let (start_offset, end_offset) = kind.offsets();
        let (start_dir, end_dir) = kind.directions();

        let start = self.endpoint(series, offset(anchor, start_offset), start_dir, warnings);
        let end = self.endpoint(series, offset(anchor, end_offset), end_dir, warnings);
        let (start, end) = (start?, end?);

        let change = percent_change(start.price, end.price);
        if change.is_none() {
            warnings.insert(DataWarning::ArithmeticOverflow {
                symbol: series.symbol().to_string(),
                metric: kind,
            });
        }
        change
    }

    /// Resolves one endpoint, rejecting samples that fail integrity checks.
    fn endpoint<'s>(
        &self,
        series: &'s PriceSeries,
        target: Option<NaiveDate>,
        direction: Direction,
        warnings: &mut BTreeSet<DataWarning>,
    ) -> Option<&'s PriceSample> {
        let sample = resolve(series, target?, direction)?;

        if series.is_duplicated(sample.date) {
            tracing::warn!(symbol = series.symbol(), date = %sample.date, "Duplicate price samples.");
            warnings.insert(DataWarning::DuplicateDate {
                symbol: series.symbol().to_string(),
                date: sample.date,
            });
            return None;
        }
        if sample.price <= Decimal::ZERO {
            tracing::warn!(symbol = series.symbol(), date = %sample.date, price = %sample.price, "Non-positive price.");
            warnings.insert(DataWarning::NonPositivePrice {
                symbol: series.symbol().to_string(),
                date: sample.date,
                price: sample.price,
            });
            return None;
        }
        Some(sample)
    }
}

fn offset(anchor: NaiveDate, days: i64) -> Option<NaiveDate> {
    anchor.checked_add_signed(Duration::days(days))
}

/// `(end / start - 1) * 100`, rounded half away from zero.
///
/// Callers guarantee `start > 0`; `None` only on decimal overflow.
fn percent_change(start: Decimal, end: Decimal) -> Option<Decimal> {
    let ratio = end.checked_div(start)?;
    let pct = ratio.checked_sub(Decimal::ONE)?.checked_mul(dec!(100))?;
    Some(pct.round_dp_with_strategy(PERCENT_SCALE, RoundingStrategy::MidpointAwayFromZero))
}
