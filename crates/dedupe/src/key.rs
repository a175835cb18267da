use chrono::NaiveDate;
use core_types::EventRecord;
use serde::Serialize;
use std::fmt;

/// The composite identity of a DAT event.
///
/// Components come from the record's already-normalized accessors, so two
/// spellings of the same ticker (`"mstr"`, `" $MSTR "`) compare equal. An absent
/// component is a value like any other: two records that both lack a date
/// still share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IdentityKey {
    pub stock_ticker: Option<String>,
    pub token_symbol: Option<String>,
    pub announcement_date: Option<NaiveDate>,
}

impl IdentityKey {
    pub fn of(record: &EventRecord) -> Self {
        Self {
            stock_ticker: record.stock_ticker().map(str::to_string),
            token_symbol: record.token_symbol().map(str::to_string),
            announcement_date: record.announcement_date(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stock_ticker.is_some() && self.token_symbol.is_some() && self.announcement_date.is_some()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self
            .announcement_date
            .map(|d| d.format("%Y-%m-%d").to_string());
        write!(
            f,
            "{}/{}/{}",
            self.stock_ticker.as_deref().unwrap_or("-"),
            self.token_symbol.as_deref().unwrap_or("-"),
            date.as_deref().unwrap_or("-"),
        )
    }
}
