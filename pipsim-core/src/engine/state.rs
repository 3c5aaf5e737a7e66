//! Engine mutable state and run result types.

use crate::domain::{ExitReason, Position};
use crate::ledger::Ledger;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use thiserror::Error;

use super::error::SimulationError;

/// Mutable state that evolves bar-by-bar during one run.
///
/// The single `open` slot is what enforces the one-open-position invariant.
#[derive(Debug, Default)]
pub struct EngineState {
    pub open: Option<Position>,
    pub closed: Vec<Position>,
    pub bar_index: usize,
    pub last_timestamp: Option<NaiveDateTime>,
    /// Bars past warmup on which the source produced a signal.
    pub signal_count: usize,
    /// Entry signals dropped because their side is not allowed.
    pub skipped_entries: usize,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the state into an abort report: closed positions survive, the open one is dropped.
    pub(crate) fn abort(self, error: SimulationError) -> RunAborted {
        RunAborted {
            bar_index: self.bar_index,
            error,
            closed: self.closed,
        }
    }
}

/// Result of a complete simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Every position of the run, in entry order, all closed.
    pub positions: Vec<Position>,
    /// Total number of bars processed.
    pub bar_count: usize,
    /// Number of warmup bars skipped for entries.
    pub warmup_bars: usize,
    pub signal_count: usize,
    pub skipped_entries: usize,
}

impl RunResult {
    pub fn ledger(&self) -> Ledger {
        Ledger::from_positions(&self.positions)
    }

    pub fn total_pips(&self) -> f64 {
        self.positions.iter().map(Position::pips).sum()
    }

    pub fn exit_counts(&self) -> BTreeMap<ExitReason, usize> {
        let mut counts = BTreeMap::new();
        for reason in self.positions.iter().filter_map(Position::exit_reason) {
            *counts.entry(reason).or_default() += 1;
        }
        counts
    }
}

/// A run that stopped at a failing bar.
///
/// Positions closed before the failure are valid and returned with the error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("simulation aborted at bar {bar_index} with {} closed positions: {error}", .closed.len())]
pub struct RunAborted {
    pub bar_index: usize,
    #[source]
    pub error: SimulationError,
    pub closed: Vec<Position>,
}

impl From<SimulationError> for RunAborted {
    fn from(error: SimulationError) -> Self {
        Self {
            bar_index: 0,
            error,
            closed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::engine::ConfigError;
    use chrono::NaiveDate;

    fn t(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 3, 15)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn closed(side: Side, entry: f64, exit: f64, reason: ExitReason) -> Position {
        let mut pos = Position::open(side, t(0), 0, entry, 0.0);
        pos.close(t(1), 1, exit, 0.0, reason).unwrap();
        pos
    }

    #[test]
    fn engine_state_initial() {
        let state = EngineState::new();
        assert!(state.open.is_none());
        assert!(state.closed.is_empty());
        assert_eq!(state.signal_count, 0);
    }

    #[test]
    fn abort_keeps_closed_and_drops_open() {
        let mut state = EngineState::new();
        state.closed.push(closed(Side::Buy, 100.0, 101.0, ExitReason::TakeProfit));
        state.open = Some(Position::open(Side::Sell, t(2), 2, 100.0, 0.0));
        state.bar_index = 9;

        let aborted = state.abort(SimulationError::MissingPriceData {
            bar_index: 9,
            field: "open".into(),
        });
        assert_eq!(aborted.bar_index, 9);
        assert_eq!(aborted.closed.len(), 1);
        assert!(aborted.to_string().contains("1 closed positions"));
    }

    #[test]
    fn config_error_converts_to_empty_abort() {
        let aborted: RunAborted = SimulationError::from(ConfigError::NoAllowedSides).into();
        assert!(aborted.closed.is_empty());
    }

    #[test]
    fn exit_counts_group_by_reason() {
        let result = RunResult {
            positions: vec![
                closed(Side::Buy, 100.0, 108.0, ExitReason::TakeProfit),
                closed(Side::Sell, 100.0, 104.0, ExitReason::StopLoss),
                closed(Side::Buy, 100.0, 110.0, ExitReason::TakeProfit),
            ],
            bar_count: 10,
            warmup_bars: 0,
            signal_count: 3,
            skipped_entries: 0,
        };
        let counts = result.exit_counts();
        assert_eq!(counts[&ExitReason::TakeProfit], 2);
        assert_eq!(counts[&ExitReason::StopLoss], 1);
        assert!((result.total_pips() - 14.0).abs() < 1e-9);
    }
}
