use crate::enums::{AssetClass, MergePolicy, MetricKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

pub const STOCK_TICKER_KEY: &str = "Stock Ticker";
pub const TOKEN_KEY: &str = "Token";
pub const ANNOUNCEMENT_DATE_KEY: &str = "Raise Ann. Date";
pub const RAISE_AMOUNT_KEY: &str = "Raise Amount";
pub const TOKEN_ANCHOR_KEY: &str = "Token Anchor Date";

pub const NOT_AVAILABLE: &str = "N/A";
pub const NOT_APPLICABLE: &str = "Not Applicable";

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// A computed value stored on a record.
///
/// `Missing` means the instrument is known but a price endpoint could not be
/// resolved. `NotApplicable` means there was no series to measure at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldValue {
    /// Percentage change, already scaled by 100.
    Percent(Decimal),
    Price(Decimal),
    Missing,
    NotApplicable,
    /// A value the extractor wrote under a computed key that we could not interpret.
    Verbatim(Value),
}

impl FieldValue {
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Percent(_) | FieldValue::Price(_) => true,
            FieldValue::Missing | FieldValue::NotApplicable => false,
            FieldValue::Verbatim(v) => !is_blank(v),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Percent(p) => Value::String(format!(
                "{:.2}%",
                p.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            )),
            FieldValue::Price(p) => Value::String(p.normalize().to_string()),
            FieldValue::Missing => Value::String(NOT_AVAILABLE.to_string()),
            FieldValue::NotApplicable => Value::String(NOT_APPLICABLE.to_string()),
            FieldValue::Verbatim(v) => v.clone(),
        }
    }

    pub fn from_json(value: &Value) -> FieldValue {
        let Value::String(raw) = value else {
            return FieldValue::Verbatim(value.clone());
        };
        let s = raw.trim();
        if s.eq_ignore_ascii_case(NOT_AVAILABLE) {
            return FieldValue::Missing;
        }
        if s.eq_ignore_ascii_case(NOT_APPLICABLE) {
            return FieldValue::NotApplicable;
        }
        if let Some(pct) = s.strip_suffix('%') {
            if let Ok(d) = Decimal::from_str(pct.trim()) {
                return FieldValue::Percent(d);
            }
        }
        match Decimal::from_str(s) {
            Ok(d) => FieldValue::Price(d),
            Err(_) => FieldValue::Verbatim(value.clone()),
        }
    }
}

/// Classification marks attached during parsing and enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RecordTag {
    /// Neither a stock ticker nor a token symbol is present.
    Ineligible,
    /// An announcement date was present but could not be parsed.
    UnparseableDate,
    /// Stock metrics need an explicit announcement date.
    StockSkippedNoAnchor,
    /// Token metrics were computed against the default anchor.
    TokenDefaultAnchor,
    TokenSkippedNoAnchor,
}

/// One extracted treasury announcement ("fact card").
///
/// The source document is kept verbatim, key order included. Computed
/// performance fields are parsed into their own map; only the ones written by
/// [`EventRecord::merge_field`] are rendered back by [`EventRecord::to_document`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    id: String,
    document: Map<String, Value>,
    stock_ticker: Option<String>,
    token_symbol: Option<String>,
    announcement_date: Option<NaiveDate>,
    token_anchor: Option<NaiveDate>,
    fields: BTreeMap<String, FieldValue>,
    /// Computed keys written since load.
    written: BTreeSet<String>,
    tags: BTreeSet<RecordTag>,
}

impl EventRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_document(id, Map::new())
    }

    /// Builds a record from a parsed JSON object, parsing any computed keys.
    pub fn from_document(id: impl Into<String>, document: Map<String, Value>) -> Self {
        let fields = document
            .iter()
            .filter(|(key, _)| is_computed_key(key))
            .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
            .collect();
        let token_anchor = document
            .get(TOKEN_ANCHOR_KEY)
            .and_then(Value::as_str)
            .and_then(parse_date);

        let mut record = Self {
            id: id.into(),
            document,
            stock_ticker: None,
            token_symbol: None,
            announcement_date: None,
            token_anchor,
            fields,
            written: BTreeSet::new(),
            tags: BTreeSet::new(),
        };
        record.refresh_identity();
        record
    }

    pub fn with_stock_ticker(self, ticker: &str) -> Self {
        self.with_value(STOCK_TICKER_KEY, Value::String(ticker.to_string()))
    }

    pub fn with_token(self, symbol: &str) -> Self {
        self.with_value(TOKEN_KEY, Value::String(symbol.to_string()))
    }

    pub fn with_announcement_date(self, date: NaiveDate) -> Self {
        self.with_value(
            ANNOUNCEMENT_DATE_KEY,
            Value::String(date.format("%Y-%m-%d").to_string()),
        )
    }

    /// Sets an arbitrary document key, re-deriving the identity fields.
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.document.insert(key.to_string(), value);
        self.refresh_identity();
        self
    }

    fn refresh_identity(&mut self) {
        self.stock_ticker = self
            .document
            .get(STOCK_TICKER_KEY)
            .and_then(value_text)
            .and_then(|s| normalize_symbol(&s));
        self.token_symbol = self
            .document
            .get(TOKEN_KEY)
            .and_then(value_text)
            .and_then(|s| normalize_symbol(&s));

        self.tags.remove(&RecordTag::UnparseableDate);
        self.announcement_date = match self.document.get(ANNOUNCEMENT_DATE_KEY) {
            Some(v) if !is_blank(v) => {
                let parsed = value_text(v).as_deref().and_then(parse_date);
                if parsed.is_none() {
                    self.tags.insert(RecordTag::UnparseableDate);
                }
                parsed
            }
            _ => None,
        };
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stock_ticker(&self) -> Option<&str> {
        self.stock_ticker.as_deref()
    }

    pub fn token_symbol(&self) -> Option<&str> {
        self.token_symbol.as_deref()
    }

    pub fn symbol(&self, asset: AssetClass) -> Option<&str> {
        match asset {
            AssetClass::Stock => self.stock_ticker(),
            AssetClass::Token => self.token_symbol(),
        }
    }

    pub fn announcement_date(&self) -> Option<NaiveDate> {
        self.announcement_date
    }

    pub fn raise_amount(&self) -> Option<&Value> {
        self.document.get(RAISE_AMOUNT_KEY).filter(|v| !is_blank(v))
    }

    /// The anchor token metrics were last computed against, when defaulted.
    pub fn token_anchor(&self) -> Option<NaiveDate> {
        self.token_anchor
    }

    pub fn set_token_anchor(&mut self, date: NaiveDate) {
        self.token_anchor = Some(date);
    }

    /// Drops a default anchor once a real announcement date takes over.
    pub fn clear_token_anchor(&mut self) -> Option<NaiveDate> {
        let previous = self.token_anchor.take();
        if previous.is_some() {
            self.document.shift_remove(TOKEN_ANCHOR_KEY);
        }
        previous
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn tags(&self) -> &BTreeSet<RecordTag> {
        &self.tags
    }

    pub fn has_tag(&self, tag: RecordTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn tag(&mut self, tag: RecordTag) {
        self.tags.insert(tag);
    }

    pub fn is_enrichment_eligible(&self) -> bool {
        self.stock_ticker.is_some() || self.token_symbol.is_some()
    }

    /// Writes a computed field according to `policy`. Returns whether it was written.
    pub fn merge_field(&mut self, key: &str, value: FieldValue, policy: MergePolicy) -> bool {
        let writable = match (policy, self.fields.get(key)) {
            (MergePolicy::Overwrite, _) | (_, None) => true,
            (MergePolicy::FillEmpty, Some(existing)) => !existing.is_filled(),
        };
        if writable {
            self.fields.insert(key.to_string(), value);
            self.written.insert(key.to_string());
        }
        writable
    }

    /// Non-empty, non-`N/A` values across the document and computed fields.
    pub fn filled_field_count(&self) -> usize {
        let document = self
            .document
            .iter()
            .filter(|(k, v)| !is_computed_key(k) && *k != TOKEN_ANCHOR_KEY && !is_blank(v))
            .count();
        let computed = self.fields.values().filter(|f| f.is_filled()).count();
        document + computed + usize::from(self.token_anchor.is_some())
    }

    /// The JSON object this record serialises to.
    ///
    /// Keys already in the source keep their position; new computed keys are
    /// appended. Values nothing wrote are emitted exactly as loaded.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut out = self.document.clone();
        if let Some(anchor) = self.token_anchor {
            let stored = out.get(TOKEN_ANCHOR_KEY).and_then(Value::as_str).and_then(parse_date);
            if stored != Some(anchor) {
                out.insert(
                    TOKEN_ANCHOR_KEY.to_string(),
                    Value::String(anchor.format("%Y-%m-%d").to_string()),
                );
            }
        }
        for key in &self.written {
            if let Some(value) = self.fields.get(key) {
                out.insert(key.clone(), value.to_json());
            }
        }
        out
    }

    /// Byte length of the pretty-printed document.
    pub fn serialized_len(&self) -> u64 {
        serde_json::to_vec_pretty(&self.to_document()).map_or(0, |b| b.len() as u64)
    }
}

/// Whether `key` is written by enrichment rather than extraction.
pub fn is_computed_key(key: &str) -> bool {
    [AssetClass::Stock, AssetClass::Token].iter().any(|&asset| {
        key == asset.anchor_price_field()
            || MetricKind::for_asset(asset)
                .iter()
                .any(|m| m.field_name(asset) == key)
    })
}

/// Trims, strips a leading `$` and upper-cases a ticker or token symbol.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim();
    let s = s.strip_prefix('$').unwrap_or(s).trim();
    if s.is_empty() || s.eq_ignore_ascii_case(NOT_AVAILABLE) {
        return None;
    }
    Some(s.to_uppercase())
}

/// Parses the date formats extractors are known to produce, truncating to the day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case(NOT_AVAILABLE) {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    let head = s.split('T').next()?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || s.eq_ignore_ascii_case(NOT_AVAILABLE)
        }
        _ => false,
    }
}
