//! Signal debouncing: collapse runs of same-direction flags into single edges.
//!
//! Raw indicator flags tend to stay `true` for many consecutive bars. The
//! debouncer keeps only the first bar of each new direction: a buy flag fires
//! once, then stays quiet until a sell has fired in between (and vice versa).

use crate::domain::Side;

/// Edge-triggering state for a `(buy, sell)` flag stream.
///
/// The only state is the current direction. A fresh or [`reset`](Self::reset)
/// debouncer has no direction, so the first flag it sees always fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalDebouncer {
    direction: Option<Side>,
}

impl SignalDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> Option<Side> {
        self.direction
    }

    pub fn reset(&mut self) {
        self.direction = None;
    }

    /// Feed one row, returning the side that fires on it (if any).
    ///
    /// Buy is checked first, so a row with both flags set resolves to buy
    /// unless buy is already the current direction.
    pub fn step(&mut self, buy: bool, sell: bool) -> Option<Side> {
        if buy && self.direction != Some(Side::Buy) {
            self.direction = Some(Side::Buy);
            Some(Side::Buy)
        } else if sell && self.direction != Some(Side::Sell) {
            self.direction = Some(Side::Sell);
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// Same as [`step`](Self::step), returning the debounced flag pair.
    pub fn step_flags(&mut self, buy: bool, sell: bool) -> (bool, bool) {
        match self.step(buy, sell) {
            Some(Side::Buy) => (true, false),
            Some(Side::Sell) => (false, true),
            None => (false, false),
        }
    }
}

/// Debounce a whole flag series with a fresh debouncer.
pub fn debounce(flags: &[(bool, bool)]) -> Vec<(bool, bool)> {
    let mut debouncer = SignalDebouncer::new();
    flags
        .iter()
        .map(|&(buy, sell)| debouncer.step_flags(buy, sell))
        .collect()
}
