//! Signal sources: per-bar directional intent fed to the engine.
//!
//! Indicator computation happens upstream; a source only reads what is already
//! on the bars (flag columns, a numeric signal column) or wraps a caller
//! closure. Sources may hold history, so they take `&mut self` and are reset
//! by the engine at the start of every run.

use crate::domain::{Bar, Side};
use thiserror::Error;

use super::debounce::SignalDebouncer;

/// A signal source failed on a bar. Fatal to the run.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct SignalError(pub String);

/// Trait for signal sources.
pub trait SignalSource {
    /// Human-readable name (e.g., "flags(buy,sell)").
    fn name(&self) -> String;

    /// Clear all history. Called by the engine before the first bar of a run.
    fn reset(&mut self) {}

    /// Signal for `bars[index]`. Implementations may only read `bars[..=index]`.
    fn evaluate(&mut self, bars: &[Bar], index: usize) -> Result<Option<Side>, SignalError>;
}

/// Debounced buy/sell flag columns.
#[derive(Debug, Clone)]
pub struct FlagSignal {
    buy_column: String,
    sell_column: String,
    debouncer: SignalDebouncer,
}

impl FlagSignal {
    pub fn new(buy_column: impl Into<String>, sell_column: impl Into<String>) -> Self {
        Self {
            buy_column: buy_column.into(),
            sell_column: sell_column.into(),
            debouncer: SignalDebouncer::new(),
        }
    }

    fn read_flag(bar: &Bar, index: usize, column: &str) -> Result<bool, SignalError> {
        bar.flag(column)
            .ok_or_else(|| SignalError(format!("bar {index} has no flag column '{column}'")))
    }
}

impl Default for FlagSignal {
    fn default() -> Self {
        Self::new("buy", "sell")
    }
}

impl SignalSource for FlagSignal {
    fn name(&self) -> String {
        format!("flags({},{})", self.buy_column, self.sell_column)
    }

    fn reset(&mut self) {
        self.debouncer.reset();
    }

    fn evaluate(&mut self, bars: &[Bar], index: usize) -> Result<Option<Side>, SignalError> {
        let bar = &bars[index];
        let buy = Self::read_flag(bar, index, &self.buy_column)?;
        let sell = Self::read_flag(bar, index, &self.sell_column)?;
        Ok(self.debouncer.step(buy, sell))
    }
}

/// Numeric signal column: positive buys, negative sells, zero or NaN is no signal.
///
/// Not debounced; the column is taken as already edge-triggered.
#[derive(Debug, Clone)]
pub struct ColumnSignal {
    column: String,
}

impl ColumnSignal {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl SignalSource for ColumnSignal {
    fn name(&self) -> String {
        format!("column({})", self.column)
    }

    fn evaluate(&mut self, bars: &[Bar], index: usize) -> Result<Option<Side>, SignalError> {
        let value = bars[index].field(&self.column).ok_or_else(|| {
            SignalError(format!("bar {index} has no column '{}'", self.column))
        })?;
        Ok(if value > 0.0 {
            Some(Side::Buy)
        } else if value < 0.0 {
            Some(Side::Sell)
        } else {
            None
        })
    }
}

/// Precomputed signal per bar, aligned by index.
#[derive(Debug, Clone)]
pub struct SignalSeries {
    signals: Vec<Option<Side>>,
}

impl SignalSeries {
    pub fn new(signals: Vec<Option<Side>>) -> Self {
        Self { signals }
    }
}

impl SignalSource for SignalSeries {
    fn name(&self) -> String {
        "series".into()
    }

    fn evaluate(&mut self, bars: &[Bar], index: usize) -> Result<Option<Side>, SignalError> {
        self.signals.get(index).copied().ok_or_else(|| {
            SignalError(format!(
                "signal series has {} entries but bar sequence has {}",
                self.signals.len(),
                bars.len()
            ))
        })
    }
}

/// Caller-supplied strategy function.
pub struct FnSignal<F> {
    name: String,
    f: F,
}

impl<F> FnSignal<F>
where
    F: FnMut(&[Bar], usize) -> Result<Option<Side>, SignalError>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> SignalSource for FnSignal<F>
where
    F: FnMut(&[Bar], usize) -> Result<Option<Side>, SignalError>,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn evaluate(&mut self, bars: &[Bar], index: usize) -> Result<Option<Side>, SignalError> {
        (self.f)(bars, index)
    }
}
