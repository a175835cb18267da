use analytics::PerformanceCalculator;
use chrono::NaiveDate;
use core_types::{
    AssetClass, DataWarning, EnrichmentMode, EventRecord, FieldValue, MergePolicy, MetricKind,
    PriceSeries, RecordTag, TokenAnchorFallback,
};
use serde::Serialize;

/// Per-invocation enrichment parameters. Nothing here is global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    pub mode: EnrichmentMode,
    /// The processing date. The token fallback anchor is derived from it.
    pub as_of: NaiveDate,
    pub token_anchor_fallback: TokenAnchorFallback,
    pub merge: MergePolicy,
}

impl EnrichOptions {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            mode: EnrichmentMode::default(),
            as_of,
            token_anchor_fallback: TokenAnchorFallback::default(),
            merge: MergePolicy::default(),
        }
    }
}

/// Where a token anchor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAnchor {
    Announced(NaiveDate),
    /// Chosen by the fallback policy, or carried over from an earlier run.
    Defaulted(NaiveDate),
}

impl TokenAnchor {
    pub fn date(&self) -> NaiveDate {
        match self {
            TokenAnchor::Announced(d) | TokenAnchor::Defaulted(d) => *d,
        }
    }
}

/// An enriched record plus the data-quality warnings raised for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    pub record: EventRecord,
    pub warnings: Vec<DataWarning>,
}

/// Counts reported after a batch, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentSummary {
    pub records: usize,
    pub ineligible: usize,
    pub default_anchor: usize,
    pub with_warnings: usize,
}

impl EnrichmentSummary {
    pub fn from_outcomes(outcomes: &[EnrichmentOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            acc.records += 1;
            acc.ineligible += usize::from(o.record.has_tag(RecordTag::Ineligible));
            acc.default_anchor += usize::from(o.record.has_tag(RecordTag::TokenDefaultAnchor));
            acc.with_warnings += usize::from(!o.warnings.is_empty());
            acc
        })
    }
}

/// Attaches stock and token performance fields to one record.
///
/// The enricher never fetches prices; callers hand it whatever series they
/// obtained. Running it twice with the same inputs yields the same record.
#[derive(Debug, Clone)]
pub struct RecordEnricher {
    options: EnrichOptions,
    calculator: PerformanceCalculator,
}

impl RecordEnricher {
    pub fn new(options: EnrichOptions) -> Self {
        Self {
            options,
            calculator: PerformanceCalculator::new(),
        }
    }

    pub fn options(&self) -> &EnrichOptions {
        &self.options
    }

    /// Stock metrics only ever anchor on an explicit announcement date.
    pub fn stock_anchor(&self, record: &EventRecord) -> Option<NaiveDate> {
        record.announcement_date()
    }

    /// The token anchor, applying the fallback policy when no date was announced.
    ///
    /// A default anchor recorded by an earlier run is reused so that a later
    /// re-run does not drift to a new "yesterday".
    pub fn token_anchor(&self, record: &EventRecord) -> Option<TokenAnchor> {
        if let Some(date) = record.announcement_date() {
            return Some(TokenAnchor::Announced(date));
        }
        if let Some(date) = record.token_anchor() {
            return Some(TokenAnchor::Defaulted(date));
        }
        match self.options.token_anchor_fallback {
            TokenAnchorFallback::Yesterday => self.options.as_of.pred_opt().map(TokenAnchor::Defaulted),
            TokenAnchorFallback::Skip => None,
        }
    }

    #[tracing::instrument(name = "enrich_record", skip_all, fields(record = record.id()))]
    pub fn enrich(
        &self,
        mut record: EventRecord,
        stock_series: Option<&PriceSeries>,
        token_series: Option<&PriceSeries>,
    ) -> EnrichmentOutcome {
        let mut warnings = Vec::new();

        if !record.is_enrichment_eligible() {
            tracing::debug!("No ticker or token; passing through unenriched.");
            record.tag(RecordTag::Ineligible);
            return EnrichmentOutcome { record, warnings };
        }

        if self.options.mode.includes(AssetClass::Stock) {
            self.enrich_stock(&mut record, stock_series, &mut warnings);
        }
        if self.options.mode.includes(AssetClass::Token) {
            self.enrich_token(&mut record, token_series, &mut warnings);
        }

        EnrichmentOutcome { record, warnings }
    }

    fn enrich_stock(
        &self,
        record: &mut EventRecord,
        series: Option<&PriceSeries>,
        warnings: &mut Vec<DataWarning>,
    ) {
        let Some(anchor) = self.stock_anchor(record) else {
            tracing::debug!("No announcement date; stock metrics skipped.");
            record.tag(RecordTag::StockSkippedNoAnchor);
            return;
        };
        self.apply(record, AssetClass::Stock, anchor, series, self.options.merge, warnings);
    }

    fn enrich_token(
        &self,
        record: &mut EventRecord,
        series: Option<&PriceSeries>,
        warnings: &mut Vec<DataWarning>,
    ) {
        if record.token_symbol().is_none() {
            self.mark_not_applicable(record, AssetClass::Token, self.options.merge);
            return;
        }
        match self.token_anchor(record) {
            None => {
                tracing::debug!("No announcement date and no fallback; token metrics skipped.");
                record.tag(RecordTag::TokenSkippedNoAnchor);
            }
            Some(TokenAnchor::Announced(anchor)) => {
                // Metrics computed against a stale default anchor must be replaced.
                let merge = match record.clear_token_anchor() {
                    Some(stale) if stale != anchor => {
                        tracing::debug!(%stale, %anchor, "Announcement date replaces default token anchor.");
                        MergePolicy::Overwrite
                    }
                    _ => self.options.merge,
                };
                self.apply(record, AssetClass::Token, anchor, series, merge, warnings);
            }
            Some(TokenAnchor::Defaulted(anchor)) => {
                tracing::debug!(%anchor, "Using default token anchor.");
                record.tag(RecordTag::TokenDefaultAnchor);
                record.set_token_anchor(anchor);
                self.apply(record, AssetClass::Token, anchor, series, self.options.merge, warnings);
            }
        }
    }

    fn apply(
        &self,
        record: &mut EventRecord,
        asset: AssetClass,
        anchor: NaiveDate,
        series: Option<&PriceSeries>,
        merge: MergePolicy,
        warnings: &mut Vec<DataWarning>,
    ) {
        let Some(series) = series.filter(|s| !s.is_empty()) else {
            // A known symbol with no data is most likely a provider failure upstream.
            if let Some(symbol) = record.symbol(asset).map(str::to_string) {
                tracing::warn!(%asset, %symbol, "No price series supplied for a known symbol.");
                warnings.push(DataWarning::SeriesUnavailable { asset, symbol });
            }
            self.mark_not_applicable(record, asset, merge);
            return;
        };

        let report = self.calculator.compute(anchor, series, asset);

        let price = report.anchor_price.map_or(FieldValue::Missing, FieldValue::Price);
        record.merge_field(asset.anchor_price_field(), price, merge);
        for (kind, value) in &report.metrics {
            let value = value.map_or(FieldValue::Missing, FieldValue::Percent);
            record.merge_field(&kind.field_name(asset), value, merge);
        }
        warnings.extend(report.warnings);
    }

    fn mark_not_applicable(&self, record: &mut EventRecord, asset: AssetClass, merge: MergePolicy) {
        record.merge_field(asset.anchor_price_field(), FieldValue::NotApplicable, merge);
        for kind in MetricKind::for_asset(asset) {
            record.merge_field(&kind.field_name(asset), FieldValue::NotApplicable, merge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core_types::PriceSample;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 27).unwrap()
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
    }

    fn series(symbol: &str, points: &[(i64, rust_decimal::Decimal)], around: NaiveDate) -> PriceSeries {
        PriceSeries::new(
            symbol,
            points
                .iter()
                .map(|&(d, p)| PriceSample::new(around + Duration::days(d), p))
                .collect(),
        )
    }

    fn stock_series() -> PriceSeries {
        series(
            "MSTR",
            &[(-10, dec!(10)), (-1, dec!(12)), (0, dec!(11)), (1, dec!(13)), (7, dec!(15))],
            anchor(),
        )
    }

    fn token_series(around: NaiveDate) -> PriceSeries {
        series(
            "BTC-USD",
            &[(-7, dec!(100)), (-1, dec!(104)), (0, dec!(105)), (1, dec!(110)), (7, dec!(120))],
            around,
        )
    }

    fn enricher() -> RecordEnricher {
        RecordEnricher::new(EnrichOptions::new(as_of()))
    }

    #[test]
    fn dated_record_gets_stock_and_token_fields() {
        let record = EventRecord::new("1")
            .with_stock_ticker("MSTR")
            .with_token("BTC")
            .with_announcement_date(anchor());
        let outcome = enricher().enrich(record, Some(&stock_series()), Some(&token_series(anchor())));
        let r = &outcome.record;

        assert_eq!(r.field("1D Stock Perf"), Some(&FieldValue::Percent(dec!(18.18))));
        assert_eq!(r.field("30D Stock Perf"), Some(&FieldValue::Missing));
        assert_eq!(r.field("Share Price on Ann. Date"), Some(&FieldValue::Price(dec!(11))));
        assert_eq!(r.field("7D Token Perf"), Some(&FieldValue::Percent(dec!(14.29))));
        assert_eq!(r.field("-7D Token Perf"), Some(&FieldValue::Percent(dec!(5))));
        assert!(r.field("30D Token Perf").is_none());
        assert!(r.token_anchor().is_none());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn undated_record_skips_stock_and_defaults_token_to_yesterday() {
        let yesterday = as_of().pred_opt().unwrap();
        let record = EventRecord::new("2").with_token("BTC");
        let outcome = enricher().enrich(record, None, Some(&token_series(yesterday)));
        let r = &outcome.record;

        assert!(r.fields().keys().all(|k| !k.contains("Stock") && !k.starts_with("Share")));
        assert!(r.has_tag(RecordTag::StockSkippedNoAnchor));
        assert!(r.has_tag(RecordTag::TokenDefaultAnchor));
        assert_eq!(r.token_anchor(), Some(yesterday));
        assert_eq!(r.announcement_date(), None);
        assert_eq!(r.field("D Token Perf"), Some(&FieldValue::Percent(dec!(0.96))));
    }

    #[test]
    fn skip_fallback_leaves_token_uncomputed() {
        let mut options = EnrichOptions::new(as_of());
        options.token_anchor_fallback = TokenAnchorFallback::Skip;
        let outcome = RecordEnricher::new(options).enrich(EventRecord::new("3").with_token("ETH"), None, None);
        assert!(outcome.record.has_tag(RecordTag::TokenSkippedNoAnchor));
        assert!(outcome.record.fields().is_empty());
    }

    #[test]
    fn missing_series_is_not_applicable_and_warned() {
        let record = EventRecord::new("4")
            .with_stock_ticker("ABC")
            .with_announcement_date(anchor());
        let outcome = enricher().enrich(record, Some(&PriceSeries::empty("ABC")), None);
        let r = &outcome.record;

        assert_eq!(r.field("1D Stock Perf"), Some(&FieldValue::NotApplicable));
        // no token symbol: not applicable, but nothing to warn about
        assert_eq!(r.field("1D Token Perf"), Some(&FieldValue::NotApplicable));
        assert_eq!(
            outcome.warnings,
            vec![DataWarning::SeriesUnavailable {
                asset: AssetClass::Stock,
                symbol: "ABC".to_string()
            }]
        );
    }

    #[test]
    fn gap_is_missing_not_not_applicable() {
        let record = EventRecord::new("5")
            .with_stock_ticker("ABC")
            .with_announcement_date(anchor());
        // listed after the announcement
        let late = series("ABC", &[(3, dec!(5)), (4, dec!(6))], anchor());
        let outcome = enricher().enrich(record, Some(&late), None);
        assert_eq!(outcome.record.field("D Stock Perf"), Some(&FieldValue::Missing));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn ineligible_record_passes_through_tagged() {
        let record = EventRecord::new("6").with_value("Company", json!("Acme"));
        let outcome = enricher().enrich(record.clone(), Some(&stock_series()), None);
        assert!(outcome.record.has_tag(RecordTag::Ineligible));
        assert!(outcome.record.fields().is_empty());
        assert_eq!(outcome.record.to_document(), record.to_document());
    }

    #[test]
    fn mode_limits_asset_classes() {
        let mut options = EnrichOptions::new(as_of());
        options.mode = EnrichmentMode::TokenOnly;
        let record = EventRecord::new("7")
            .with_stock_ticker("MSTR")
            .with_token("BTC")
            .with_announcement_date(anchor());
        let outcome = RecordEnricher::new(options).enrich(record, Some(&stock_series()), Some(&token_series(anchor())));
        assert!(outcome.record.field("1D Stock Perf").is_none());
        assert!(outcome.record.field("1D Token Perf").is_some());
    }

    #[test]
    fn enrichment_is_idempotent() {
        let yesterday = as_of().pred_opt().unwrap();
        let e = enricher();
        let stock = stock_series();
        let token = token_series(yesterday);
        for record in [
            EventRecord::new("a").with_stock_ticker("MSTR").with_token("BTC").with_announcement_date(anchor()),
            EventRecord::new("b").with_token("BTC"),
            EventRecord::new("c").with_stock_ticker("MSTR"),
            EventRecord::new("d"),
        ] {
            let once = e.enrich(record, Some(&stock), Some(&token));
            let twice = e.enrich(once.record.clone(), Some(&stock), Some(&token));
            assert_eq!(once.record, twice.record);
        }
    }

    #[test]
    fn carried_over_default_anchor_is_reused() {
        let first = enricher().enrich(EventRecord::new("8").with_token("SOL"), None, None);
        let later = RecordEnricher::new(EnrichOptions::new(as_of() + Duration::days(5)));
        assert_eq!(
            later.token_anchor(&first.record),
            Some(TokenAnchor::Defaulted(as_of().pred_opt().unwrap()))
        );
    }

    #[test]
    fn undated_token_without_series_is_not_applicable() {
        let yesterday = as_of().pred_opt().unwrap();
        let record = EventRecord::new("10").with_stock_ticker("MSTR").with_token("BTC");
        let outcome = enricher().enrich(record, None, Some(&PriceSeries::empty("BTC-USD")));
        let r = &outcome.record;

        assert!(r.fields().keys().all(|k| !k.contains("Stock") && !k.starts_with("Share")));
        assert_eq!(r.field("Token Price on Ann. Date"), Some(&FieldValue::NotApplicable));
        for kind in MetricKind::for_asset(AssetClass::Token) {
            assert_eq!(
                r.field(&kind.field_name(AssetClass::Token)),
                Some(&FieldValue::NotApplicable),
                "{kind:?}"
            );
        }
        assert_eq!(r.token_anchor(), Some(yesterday));
        assert_eq!(r.to_document()["Token Anchor Date"], json!("2025-11-30"));
        assert_eq!(
            outcome.warnings,
            vec![DataWarning::SeriesUnavailable {
                asset: AssetClass::Token,
                symbol: "BTC".to_string()
            }]
        );
    }

    #[test]
    fn announced_date_replaces_default_token_anchor() {
        let yesterday = as_of().pred_opt().unwrap();
        let early = series(
            "BTC-USD",
            &[(-7, dec!(50)), (-1, dec!(60)), (0, dec!(70)), (1, dec!(80)), (7, dec!(200))],
            yesterday,
        );
        let first = enricher().enrich(EventRecord::new("11").with_token("BTC"), None, Some(&early));
        assert_eq!(first.record.token_anchor(), Some(yesterday));
        assert_ne!(first.record.field("7D Token Perf"), Some(&FieldValue::Percent(dec!(14.29))));

        // the card is saved, then the extractor fills in the date
        let reloaded = EventRecord::from_document("11", first.record.to_document())
            .with_announcement_date(anchor());
        let second = enricher().enrich(reloaded, None, Some(&token_series(anchor())));
        let r = &second.record;

        assert!(r.token_anchor().is_none());
        assert!(!r.has_tag(RecordTag::TokenDefaultAnchor));
        assert!(!r.to_document().contains_key("Token Anchor Date"));
        assert_eq!(r.field("7D Token Perf"), Some(&FieldValue::Percent(dec!(14.29))));
        assert_eq!(r.field("D Token Perf"), Some(&FieldValue::Percent(dec!(0.96))));
        assert_eq!(r.field("Token Price on Ann. Date"), Some(&FieldValue::Price(dec!(105))));

        let fresh = enricher().enrich(
            EventRecord::new("12").with_token("BTC").with_announcement_date(anchor()),
            None,
            Some(&token_series(anchor())),
        );
        assert_eq!(r.fields(), fresh.record.fields());
    }

    #[test]
    fn existing_values_survive_fill_empty() {
        let mut record = EventRecord::new("9")
            .with_stock_ticker("MSTR")
            .with_announcement_date(anchor())
            .with_value("Raise Amount", json!("$2B"));
        record.merge_field("1D Stock Perf", FieldValue::Percent(dec!(1)), MergePolicy::Overwrite);
        let outcome = enricher().enrich(record, Some(&stock_series()), None);
        assert_eq!(outcome.record.field("1D Stock Perf"), Some(&FieldValue::Percent(dec!(1))));
        assert_eq!(outcome.record.raise_amount(), Some(&json!("$2B")));
        assert_eq!(outcome.record.field("7D Stock Perf"), Some(&FieldValue::Percent(dec!(36.36))));
    }
}
