use crate::enums::{AssetClass, MetricKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// A non-fatal data-quality signal raised while enriching one record.
///
/// Warnings never abort a batch; the affected metric is reported missing and
/// the warning travels back to the caller alongside the record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DataWarning {
    NonPositivePrice {
        symbol: String,
        date: NaiveDate,
        price: Decimal,
    },
    DuplicateDate {
        symbol: String,
        date: NaiveDate,
    },
    ArithmeticOverflow {
        symbol: String,
        metric: MetricKind,
    },
    /// A symbol is known but no usable series was supplied for it.
    SeriesUnavailable {
        asset: AssetClass,
        symbol: String,
    },
    SourceFailed {
        asset: AssetClass,
        symbol: String,
        reason: String,
    },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::NonPositivePrice { symbol, date, price } => {
                write!(f, "{symbol}: non-positive price {price} on {date}")
            }
            DataWarning::DuplicateDate { symbol, date } => {
                write!(f, "{symbol}: more than one sample on {date}")
            }
            DataWarning::ArithmeticOverflow { symbol, metric } => {
                write!(f, "{symbol}: overflow computing {} perf", metric.label())
            }
            DataWarning::SeriesUnavailable { asset, symbol } => {
                write!(f, "{asset} {symbol}: no price series available")
            }
            DataWarning::SourceFailed { asset, symbol, reason } => {
                write!(f, "{asset} {symbol}: price source failed: {reason}")
            }
        }
    }
}
