//! Position: one directional trade, from entry to exit.
//!
//! State machine: `Open(side)` → `Closed`. There is no re-open; a new signal
//! after closing always constructs a new `Position`. Slippage is adverse on
//! both legs: entry is worsened at `open`, exit at `close`.

use super::side::Side;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Illegal state transitions on a position.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("invalid transition: {side} position opened at {entry_time} is already closed")]
    AlreadyClosed {
        side: Side,
        entry_time: NaiveDateTime,
    },
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TrailingStop,
    TakeProfit,
    StopLoss,
    SignalReversal,
    /// Force-closed because the bar sequence ended.
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::SignalReversal => "signal_reversal",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

/// A single trade. Mutated in place while open, immutable once closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    side: Side,
    entry_bar: usize,
    entry_time: NaiveDateTime,
    entry_price: f64,
    exit_bar: Option<usize>,
    exit_time: Option<NaiveDateTime>,
    exit_price: Option<f64>,
    pips: f64,
    min_pips: f64,
    max_pips: f64,
    is_open: bool,
    operating_time_ms: Option<i64>,
    exit_reason: Option<ExitReason>,
}

impl Position {
    /// Open a position at `price`, worsened by `slippage`.
    pub fn open(
        side: Side,
        entry_time: NaiveDateTime,
        entry_bar: usize,
        price: f64,
        slippage: f64,
    ) -> Self {
        let entry_price = match side {
            Side::Buy => price + slippage,
            Side::Sell => price - slippage,
        };
        Self {
            side,
            entry_bar,
            entry_time,
            entry_price,
            exit_bar: None,
            exit_time: None,
            exit_price: None,
            pips: 0.0,
            min_pips: 0.0,
            max_pips: 0.0,
            is_open: true,
            operating_time_ms: None,
            exit_reason: None,
        }
    }

    /// Mark the position at `mark_price` and update the running extrema.
    ///
    /// Returns the current pips. Does not change the open state.
    pub fn compute(&mut self, mark_price: f64) -> f64 {
        self.pips = self.side.pips(self.entry_price, mark_price);
        self.min_pips = self.min_pips.min(self.pips);
        self.max_pips = self.max_pips.max(self.pips);
        debug_assert!(self.min_pips <= self.pips && self.pips <= self.max_pips);
        self.pips
    }

    /// Close the position at `price`, worsened by `slippage`.
    ///
    /// Fails with [`PositionError::AlreadyClosed`] on a closed position and leaves it untouched.
    pub fn close(
        &mut self,
        exit_time: NaiveDateTime,
        exit_bar: usize,
        price: f64,
        slippage: f64,
        reason: ExitReason,
    ) -> Result<(), PositionError> {
        if !self.is_open {
            return Err(PositionError::AlreadyClosed {
                side: self.side,
                entry_time: self.entry_time,
            });
        }

        let exit_price = match self.side {
            Side::Buy => price - slippage,
            Side::Sell => price + slippage,
        };
        self.compute(exit_price);
        self.exit_bar = Some(exit_bar);
        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.operating_time_ms = Some((exit_time - self.entry_time).num_milliseconds());
        self.exit_reason = Some(reason);
        self.is_open = false;
        Ok(())
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn entry_bar(&self) -> usize {
        self.entry_bar
    }

    pub fn entry_time(&self) -> NaiveDateTime {
        self.entry_time
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn exit_bar(&self) -> Option<usize> {
        self.exit_bar
    }

    pub fn exit_time(&self) -> Option<NaiveDateTime> {
        self.exit_time
    }

    pub fn exit_price(&self) -> Option<f64> {
        self.exit_price
    }

    pub fn pips(&self) -> f64 {
        self.pips
    }

    pub fn min_pips(&self) -> f64 {
        self.min_pips
    }

    pub fn max_pips(&self) -> f64 {
        self.max_pips
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Entry-to-exit duration; `None` while open.
    pub fn operating_time(&self) -> Option<Duration> {
        self.operating_time_ms.map(Duration::milliseconds)
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    pub fn is_winner(&self) -> bool {
        self.pips > 0.0
    }
}
