//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fixed-period OHLC bar, optionally carrying tick quotes and derived columns.
///
/// Tick-level data is represented with the same type: `bid`/`ask`/`last` are
/// populated and OHLC mirror `last`. Derived columns (indicator values, signal
/// flags) are attached by upstream computation and looked up by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Period start.
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<f64>,
    /// Numeric columns (indicator values, numeric signals).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, f64>,
    /// Boolean columns (raw buy/sell flags).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, bool>,
}

impl Bar {
    /// Plain OHLC bar with no quotes or derived columns.
    pub fn new(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            bid: None,
            ask: None,
            last: None,
            columns: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }

    /// Tick row: OHLC all equal `last`, quotes populated.
    pub fn tick(timestamp: NaiveDateTime, bid: f64, ask: f64, last: f64) -> Self {
        let mut bar = Self::new(timestamp, last, last, last, last);
        bar.bid = Some(bid);
        bar.ask = Some(ask);
        bar.last = Some(last);
        bar
    }

    pub fn with_column(mut self, name: impl Into<String>, value: f64) -> Self {
        self.columns.insert(name.into(), value);
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// Look up a numeric field by name: built-in price fields first, then derived columns.
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "bid" => self.bid,
            "ask" => self.ask,
            "last" => self.last,
            other => self.columns.get(other).copied(),
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }
}
