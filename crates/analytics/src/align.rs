//! Calendar-date to trading-date alignment.
//!
//! Performance windows are defined on calendar offsets (D-7, D+1, ...), but
//! price series only carry trading days. Every endpoint goes through
//! [`resolve`] rather than assuming its target date exists in the series.

use chrono::NaiveDate;
use core_types::{Direction, PriceSample, PriceSeries};

/// Finds the sample closest to `target` on the permitted side of it.
///
/// Returns `None` when nothing satisfies the direction, e.g. the target
/// predates listing or lies beyond the fetched window. If several samples
/// share the resolved date, the first one in series order wins.
pub fn resolve(series: &PriceSeries, target: NaiveDate, direction: Direction) -> Option<&PriceSample> {
    let samples = series.samples();
    let date = match direction {
        Direction::OnOrBefore => {
            let idx = samples.partition_point(|s| s.date <= target);
            samples.get(idx.checked_sub(1)?)?.date
        }
        Direction::OnOrAfter => {
            let idx = samples.partition_point(|s| s.date < target);
            samples.get(idx)?.date
        }
    };
    let first = samples.partition_point(|s| s.date < date);
    samples.get(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    /// Mon 2 .. Fri 6, then Mon 9 .. Fri 13 (weekend gap on 7-8).
    fn weekday_series() -> PriceSeries {
        let days = [2, 3, 4, 5, 6, 9, 10, 11, 12, 13];
        PriceSeries::new(
            "MSTR",
            days.iter()
                .map(|&d| PriceSample::new(day(d), Decimal::from(d)))
                .collect(),
        )
    }

    #[test]
    fn exact_hit_in_both_directions() {
        let s = weekday_series();
        assert_eq!(resolve(&s, day(4), Direction::OnOrBefore).unwrap().date, day(4));
        assert_eq!(resolve(&s, day(4), Direction::OnOrAfter).unwrap().date, day(4));
    }

    #[test]
    fn weekend_falls_back_or_forward() {
        let s = weekday_series();
        assert_eq!(resolve(&s, day(7), Direction::OnOrBefore).unwrap().date, day(6));
        assert_eq!(resolve(&s, day(8), Direction::OnOrAfter).unwrap().date, day(9));
    }

    #[test]
    fn outside_coverage_is_none() {
        let s = weekday_series();
        assert!(resolve(&s, day(1), Direction::OnOrBefore).is_none());
        assert!(resolve(&s, day(14), Direction::OnOrAfter).is_none());
        assert!(resolve(&PriceSeries::empty("X"), day(5), Direction::OnOrBefore).is_none());
    }

    #[test]
    fn never_crosses_the_target() {
        let s = weekday_series();
        for d in 1..=15 {
            if let Some(b) = resolve(&s, day(d), Direction::OnOrBefore) {
                assert!(b.date <= day(d));
            }
            if let Some(a) = resolve(&s, day(d), Direction::OnOrAfter) {
                assert!(a.date >= day(d));
            }
        }
    }

    #[test]
    fn duplicate_dates_resolve_to_first_encountered() {
        let s = PriceSeries::new(
            "ETH-USD",
            vec![
                PriceSample::new(day(3), dec!(10)),
                PriceSample::new(day(5), dec!(20)),
                PriceSample::new(day(5), dec!(21)),
            ],
        );
        assert_eq!(resolve(&s, day(6), Direction::OnOrBefore).unwrap().price, dec!(20));
        assert_eq!(resolve(&s, day(4), Direction::OnOrAfter).unwrap().price, dec!(20));
    }
}
