use crate::batch::EnrichmentJob;
use crate::enricher::RecordEnricher;
use crate::error::SourceError;
use chrono::{Duration, NaiveDate};
use core_types::{AssetClass, DataWarning, EventRecord, PriceSeries};

/// Calendar days fetched before the anchor (covers the -30D window).
pub const LOOKBACK_DAYS: i64 = 30;
/// Calendar days fetched after the anchor (covers the 30D window).
pub const LOOKAHEAD_DAYS: i64 = 30;

/// An inclusive range of calendar dates to fetch prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The window every metric offset around `anchor` falls inside, or `None`
    /// when it would run past the representable calendar.
    pub fn around(anchor: NaiveDate) -> Option<Self> {
        Some(Self {
            start: anchor.checked_sub_signed(Duration::days(LOOKBACK_DAYS))?,
            end: anchor.checked_add_signed(Duration::days(LOOKAHEAD_DAYS))?,
        })
    }
}

/// A collaborator that supplies historical prices.
///
/// Authentication, rate limiting and retries are the implementor's concern.
/// `Ok(None)` means the provider has no data for the symbol.
pub trait PriceSource: Send + Sync {
    fn series(
        &self,
        symbol: &str,
        asset: AssetClass,
        window: DateWindow,
    ) -> Result<Option<PriceSeries>, SourceError>;
}

/// Fetches the series each record needs and packages them as jobs.
///
/// Source failures are recorded on the job as `DataWarning::SourceFailed`.
pub fn prepare_jobs<S>(enricher: &RecordEnricher, records: Vec<EventRecord>, source: &S) -> Vec<EnrichmentJob>
where
    S: PriceSource + ?Sized,
{
    let mode = enricher.options().mode;
    records
        .into_iter()
        .map(|record| {
            let stock = match (record.stock_ticker(), enricher.stock_anchor(&record)) {
                (Some(ticker), Some(anchor)) if mode.includes(AssetClass::Stock) => {
                    Some((ticker.to_string(), anchor))
                }
                _ => None,
            };
            let token = match (record.token_symbol(), enricher.token_anchor(&record)) {
                (Some(symbol), Some(anchor)) if mode.includes(AssetClass::Token) => {
                    Some((symbol.to_string(), anchor.date()))
                }
                _ => None,
            };

            let mut job = EnrichmentJob::new(record);
            if let Some((ticker, anchor)) = stock {
                job.stock_series = fetch(source, &ticker, AssetClass::Stock, anchor, &mut job.source_warnings);
            }
            if let Some((symbol, anchor)) = token {
                job.token_series = fetch(source, &symbol, AssetClass::Token, anchor, &mut job.source_warnings);
            }
            job
        })
        .collect()
}

fn fetch<S>(
    source: &S,
    symbol: &str,
    asset: AssetClass,
    anchor: NaiveDate,
    warnings: &mut Vec<DataWarning>,
) -> Option<PriceSeries>
where
    S: PriceSource + ?Sized,
{
    let Some(window) = DateWindow::around(anchor) else {
        tracing::warn!(%asset, symbol, %anchor, "Anchor date out of range; no prices requested.");
        warnings.push(DataWarning::SourceFailed {
            asset,
            symbol: symbol.to_string(),
            reason: format!("anchor date {anchor} is out of range"),
        });
        return None;
    };
    match source.series(symbol, asset, window) {
        Ok(series) => series,
        Err(e) => {
            tracing::warn!(%asset, symbol, error = %e, "Price source failed.");
            warnings.push(DataWarning::SourceFailed {
                asset,
                symbol: symbol.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}
