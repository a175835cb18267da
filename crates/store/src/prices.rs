use configuration::PriceSettings;
use core_types::record::parse_date;
use core_types::{AssetClass, PriceSample, PriceSeries};
use enricher::{DateWindow, PriceSource, SourceError};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;

/// One row of a price file: `{"date": "2025-10-27", "price": 105.5}`.
#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    price: Value,
}

/// Reads daily prices from `<dir>/<SYMBOL>.json`.
///
/// Token symbols go through the configured aliases first (`BTC` reads
/// `BTC-USD.json`). A missing file means "no data", not an error.
#[derive(Debug, Clone)]
pub struct FilePriceSource {
    settings: PriceSettings,
}

impl FilePriceSource {
    pub fn new(settings: PriceSettings) -> Self {
        Self { settings }
    }

    /// The price file for `symbol`. Names that could leave the price
    /// directory are rejected.
    pub fn file_for(&self, symbol: &str, asset: AssetClass) -> Result<PathBuf, SourceError> {
        let name = match asset {
            AssetClass::Stock => symbol.to_uppercase(),
            AssetClass::Token => self.settings.token_file_symbol(symbol),
        };
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(SourceError::InvalidSymbol(name));
        }
        Ok(self.settings.dir.join(format!("{name}.json")))
    }
}

impl PriceSource for FilePriceSource {
    fn series(
        &self,
        symbol: &str,
        asset: AssetClass,
        window: DateWindow,
    ) -> Result<Option<PriceSeries>, SourceError> {
        let path = self.file_for(symbol, asset)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(%asset, symbol, path = %path.display(), "No price file.");
                return Ok(None);
            }
            Err(source) => {
                return Err(SourceError::Io {
                    symbol: symbol.to_string(),
                    source,
                });
            }
        };

        let malformed = |reason: String| SourceError::Malformed {
            symbol: symbol.to_string(),
            reason,
        };

        let rows: Vec<PriceRow> = serde_json::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;
        let samples = rows
            .into_iter()
            .map(|row| {
                let date = parse_date(&row.date).ok_or_else(|| malformed(format!("unparseable date {:?}", row.date)))?;
                let price = parse_price(&row.price).ok_or_else(|| malformed(format!("unparseable price on {date}")))?;
                Ok(PriceSample::new(date, price))
            })
            .collect::<Result<Vec<_>, SourceError>>()?;

        let series = PriceSeries::new(symbol, samples).window(window.start, window.end);
        Ok(Some(series))
    }
}

/// Prices may be JSON numbers or strings; numbers are read from their text so
/// no binary-float rounding creeps in.
fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn source(dir: &std::path::Path) -> FilePriceSource {
        FilePriceSource::new(PriceSettings {
            dir: dir.to_path_buf(),
            ..Default::default()
        })
    }

    #[test]
    fn reads_numbers_and_strings_and_trims_to_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("BTC-USD.json"),
            r#"[
                {"date": "2025-10-28", "price": "110.10"},
                {"date": "2025-10-27", "price": 105.5},
                {"date": "2025-08-01", "price": 90}
            ]"#,
        )
        .unwrap();

        let series = source(dir.path())
            .series("BTC", AssetClass::Token, DateWindow::around(day(27)).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.samples()[0], PriceSample::new(day(27), dec!(105.5)));
        assert_eq!(series.samples()[1].price, dec!(110.10));
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let result = source(dir.path()).series("MSTR", AssetClass::Stock, DateWindow::around(day(27)).unwrap());
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn garbage_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("MSTR.json"), r#"[{"date": "soon", "price": 1}]"#).unwrap();
        let result = source(dir.path()).series("MSTR", AssetClass::Stock, DateWindow::around(day(27)).unwrap());
        assert!(matches!(result, Err(SourceError::Malformed { .. })));
    }

    #[test]
    fn unmapped_tokens_use_their_own_symbol() {
        let src = source(std::path::Path::new("/prices"));
        assert_eq!(src.file_for("PENGU", AssetClass::Token).unwrap(), PathBuf::from("/prices/PENGU.json"));
        assert_eq!(src.file_for("eth", AssetClass::Token).unwrap(), PathBuf::from("/prices/ETH-USD.json"));
    }

    #[test]
    fn symbols_cannot_escape_the_price_dir() {
        let dir = tempfile::tempdir().unwrap();
        let prices = dir.path().join("prices");
        fs::create_dir(&prices).unwrap();
        fs::write(dir.path().join("X.json"), r#"[{"date": "2025-10-27", "price": 1}]"#).unwrap();

        let src = source(&prices);
        for symbol in ["../x", "..\\x", "a/b", ".."] {
            let result = src.series(symbol, AssetClass::Stock, DateWindow::around(day(27)).unwrap());
            assert!(matches!(result, Err(SourceError::InvalidSymbol(_))), "{symbol}");
        }
        assert!(src.file_for("BRK.B", AssetClass::Stock).is_ok());
    }
}
