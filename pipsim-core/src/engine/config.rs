//! Simulation configuration and price selection.
//!
//! | option          | default               | effect                                        |
//! |-----------------|-----------------------|-----------------------------------------------|
//! | `risk`          | all thresholds unset  | early exits (trailing, take profit, stop)     |
//! | `slippage`      | `0.0`                 | adverse offset on entry and exit              |
//! | `price`         | `SingleField("open")` | which quote supplies entry/mark/exit prices   |
//! | `reentry`       | `NextBar`             | whether a new position may open on a close bar|
//! | `allowed_sides` | `[Buy, Sell]`         | sides that may open a position                |
//! | `warmup_bars`   | `0`                   | leading bars on which no entry is taken       |

use crate::components::RiskPolicy;
use crate::domain::{Bar, Side};
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, SimulationError};

/// Which bar field(s) supply the entry, mark and exit prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceSource {
    /// Midpoint of bid and ask for every leg.
    Mid,
    /// Buys enter at the ask and exit at the bid; sells the other way round.
    BidAsk,
    /// One named field (`open`, `close`, `last`, or a derived column) for every leg.
    SingleField { field: String },
}

impl PriceSource {
    pub fn field(name: impl Into<String>) -> Self {
        PriceSource::SingleField { field: name.into() }
    }
}

impl Default for PriceSource {
    fn default() -> Self {
        PriceSource::field("open")
    }
}

/// Whether a position may open on the same bar that closed the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// Entries resume on the bar after a close.
    #[default]
    NextBar,
    /// A close frees the slot immediately; the same bar's signal may open.
    SameBar,
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub risk: RiskPolicy,
    #[serde(default)]
    pub slippage: f64,
    #[serde(default)]
    pub price: PriceSource,
    #[serde(default)]
    pub reentry: ReentryPolicy,
    #[serde(default = "default_sides")]
    pub allowed_sides: Vec<Side>,
    #[serde(default)]
    pub warmup_bars: usize,
}

fn default_sides() -> Vec<Side> {
    vec![Side::Buy, Side::Sell]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            risk: RiskPolicy::default(),
            slippage: 0.0,
            price: PriceSource::default(),
            reentry: ReentryPolicy::default(),
            allowed_sides: default_sides(),
            warmup_bars: 0,
        }
    }
}

impl SimulationConfig {
    pub fn with_risk(mut self, risk: RiskPolicy) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.slippage = slippage;
        self
    }

    pub fn with_price(mut self, price: PriceSource) -> Self {
        self.price = price;
        self
    }

    pub fn with_reentry(mut self, reentry: ReentryPolicy) -> Self {
        self.reentry = reentry;
        self
    }

    pub fn with_sides(mut self, sides: Vec<Side>) -> Self {
        self.allowed_sides = sides;
        self
    }

    pub fn with_warmup(mut self, bars: usize) -> Self {
        self.warmup_bars = bars;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate()?;
        if !self.slippage.is_finite() || self.slippage < 0.0 {
            return Err(ConfigError::InvalidSlippage(self.slippage));
        }
        if let PriceSource::SingleField { field } = &self.price {
            if field.trim().is_empty() {
                return Err(ConfigError::EmptyPriceField);
            }
        }
        if self.allowed_sides.is_empty() {
            return Err(ConfigError::NoAllowedSides);
        }
        Ok(())
    }
}

// ─── Resolved price rule ────────────────────────────────────────────

/// A bar field resolved from its name once, at engine construction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PriceField {
    Open,
    High,
    Low,
    Close,
    Bid,
    Ask,
    Last,
    Column(String),
}

impl PriceField {
    fn resolve(name: &str) -> Self {
        match name.trim() {
            "open" => PriceField::Open,
            "high" => PriceField::High,
            "low" => PriceField::Low,
            "close" => PriceField::Close,
            "bid" => PriceField::Bid,
            "ask" => PriceField::Ask,
            "last" => PriceField::Last,
            other => PriceField::Column(other.to_string()),
        }
    }

    fn name(&self) -> &str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Bid => "bid",
            PriceField::Ask => "ask",
            PriceField::Last => "last",
            PriceField::Column(name) => name,
        }
    }

    fn read(&self, bar: &Bar, bar_index: usize) -> Result<f64, SimulationError> {
        let value = match self {
            PriceField::Open => Some(bar.open),
            PriceField::High => Some(bar.high),
            PriceField::Low => Some(bar.low),
            PriceField::Close => Some(bar.close),
            PriceField::Bid => bar.bid,
            PriceField::Ask => bar.ask,
            PriceField::Last => bar.last,
            PriceField::Column(name) => bar.columns.get(name).copied(),
        };
        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(SimulationError::MissingPriceData {
                bar_index,
                field: self.name().to_string(),
            }),
        }
    }
}

/// [`PriceSource`] resolved into direct field accessors.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PriceRule {
    Single(PriceField),
    BidAsk,
    Mid,
}

impl PriceRule {
    pub(crate) fn resolve(source: &PriceSource) -> Self {
        match source {
            PriceSource::SingleField { field } => PriceRule::Single(PriceField::resolve(field)),
            PriceSource::BidAsk => PriceRule::BidAsk,
            PriceSource::Mid => PriceRule::Mid,
        }
    }

    fn mid(bar: &Bar, bar_index: usize) -> Result<f64, SimulationError> {
        let bid = PriceField::Bid.read(bar, bar_index)?;
        let ask = PriceField::Ask.read(bar, bar_index)?;
        Ok((bid + ask) / 2.0)
    }

    /// Price at which a `side` position opens on this bar.
    pub(crate) fn entry(&self, bar: &Bar, bar_index: usize, side: Side) -> Result<f64, SimulationError> {
        match self {
            PriceRule::Single(field) => field.read(bar, bar_index),
            PriceRule::BidAsk => match side {
                Side::Buy => PriceField::Ask.read(bar, bar_index),
                Side::Sell => PriceField::Bid.read(bar, bar_index),
            },
            PriceRule::Mid => Self::mid(bar, bar_index),
        }
    }

    /// Price at which an open `side` position is marked and closed on this bar.
    pub(crate) fn exit(&self, bar: &Bar, bar_index: usize, side: Side) -> Result<f64, SimulationError> {
        match self {
            PriceRule::Single(field) => field.read(bar, bar_index),
            PriceRule::BidAsk => match side {
                Side::Buy => PriceField::Bid.read(bar, bar_index),
                Side::Sell => PriceField::Ask.read(bar, bar_index),
            },
            PriceRule::Mid => Self::mid(bar, bar_index),
        }
    }

    /// Price for the end-of-data force close: the bar's close for single-field
    /// rules, the side's exit quote otherwise.
    pub(crate) fn final_exit(
        &self,
        bar: &Bar,
        bar_index: usize,
        side: Side,
    ) -> Result<f64, SimulationError> {
        match self {
            PriceRule::Single(_) => PriceField::Close.read(bar, bar_index),
            _ => self.exit(bar, bar_index, side),
        }
    }
}
