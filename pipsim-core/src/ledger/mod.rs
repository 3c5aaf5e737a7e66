//! Ledger: closed positions as a trade table with a running balance.
//!
//! Pure post-processing of the engine output: positions in, rows out. Runs
//! over disjoint ranges are concatenated in the order given and the balance is
//! recomputed across the whole table; rows are never re-sorted.

pub mod estimate;
pub mod summary;

pub use estimate::reversal_pips;
pub use summary::LedgerSummary;

use crate::domain::{ExitReason, Position, Side};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One closed position plus the cumulative balance up to and including it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub side: Side,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub operating_time_ms: i64,
    pub pips: f64,
    pub min_pips: f64,
    pub max_pips: f64,
    pub exit_reason: ExitReason,
    pub balance: f64,
}

impl LedgerRow {
    /// `None` for a position that is still open.
    fn from_position(position: &Position, balance: f64) -> Option<Self> {
        if position.is_open() {
            return None;
        }
        Some(Self {
            side: position.side(),
            entry_bar: position.entry_bar(),
            entry_time: position.entry_time(),
            entry_price: position.entry_price(),
            exit_bar: position.exit_bar()?,
            exit_time: position.exit_time()?,
            exit_price: position.exit_price()?,
            operating_time_ms: position.operating_time()?.num_milliseconds(),
            pips: position.pips(),
            min_pips: position.min_pips(),
            max_pips: position.max_pips(),
            exit_reason: position.exit_reason()?,
            balance: balance + position.pips(),
        })
    }

    pub fn is_winner(&self) -> bool {
        self.pips > 0.0
    }
}

/// Append-only trade table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per closed position, in the given order. Open positions are skipped.
    pub fn from_positions(positions: &[Position]) -> Self {
        let mut ledger = Self::new();
        ledger.extend_positions(positions);
        ledger
    }

    /// Append the closed positions of another run, continuing the balance.
    pub fn extend_positions(&mut self, positions: &[Position]) {
        let mut balance = self.final_balance();
        for position in positions {
            if let Some(row) = LedgerRow::from_position(position, balance) {
                balance = row.balance;
                self.rows.push(row);
            }
        }
    }

    /// Concatenate ledgers in the order given, recomputing the balance column.
    pub fn concat<I>(ledgers: I) -> Self
    where
        I: IntoIterator<Item = Ledger>,
    {
        let mut rows: Vec<LedgerRow> = ledgers.into_iter().flat_map(|l| l.rows).collect();
        let mut balance = 0.0;
        for row in &mut rows {
            balance += row.pips;
            row.balance = balance;
        }
        Self { rows }
    }

    /// Shift every row's bar indices by `offset`, e.g. from session-local to file-global.
    pub fn offset_bars(&mut self, offset: usize) {
        for row in &mut self.rows {
            row.entry_bar += offset;
            row.exit_bar += offset;
        }
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_pips(&self) -> f64 {
        self.rows.iter().map(|r| r.pips).sum()
    }

    /// Balance after the last row; zero for an empty ledger.
    pub fn final_balance(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.balance)
    }

    /// `(exit_time, balance)` per row.
    pub fn balance_curve(&self) -> Vec<(NaiveDateTime, f64)> {
        self.rows.iter().map(|r| (r.exit_time, r.balance)).collect()
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary::compute(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 3, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn closed(side: Side, start: i64, entry: f64, exit: f64) -> Position {
        let mut pos = Position::open(side, t(start), start as usize, entry, 0.0);
        pos.close(t(start + 1), start as usize + 1, exit, 0.0, ExitReason::SignalReversal)
            .unwrap();
        pos
    }

    #[test]
    fn empty_positions_give_empty_ledger() {
        let ledger = Ledger::from_positions(&[]);
        assert!(ledger.is_empty());
        assert_eq!(ledger.final_balance(), 0.0);
        assert!(ledger.balance_curve().is_empty());
    }

    #[test]
    fn balance_is_cumulative_pips() {
        let ledger = Ledger::from_positions(&[
            closed(Side::Buy, 0, 100.0, 108.0),
            closed(Side::Sell, 2, 108.0, 110.0),
            closed(Side::Buy, 4, 110.0, 115.0),
        ]);
        let balances: Vec<f64> = ledger.rows().iter().map(|r| r.balance).collect();
        assert_eq!(balances, vec![8.0, 6.0, 11.0]);
        assert_eq!(ledger.total_pips(), 11.0);
    }

    #[test]
    fn open_positions_are_not_rows() {
        let open = Position::open(Side::Buy, t(9), 9, 100.0, 0.0);
        let ledger = Ledger::from_positions(&[closed(Side::Buy, 0, 100.0, 101.0), open]);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn concat_keeps_order_and_rebalances() {
        let day1 = Ledger::from_positions(&[closed(Side::Buy, 0, 100.0, 103.0)]);
        let day2 = Ledger::from_positions(&[
            closed(Side::Sell, 10, 100.0, 101.0),
            closed(Side::Buy, 12, 100.0, 104.0),
        ]);
        let all = Ledger::concat([day1, day2]);
        let balances: Vec<f64> = all.rows().iter().map(|r| r.balance).collect();
        assert_eq!(balances, vec![3.0, 2.0, 6.0]);
        assert_eq!(all.rows()[1].entry_bar, 10);
    }

    #[test]
    fn extend_continues_balance() {
        let mut ledger = Ledger::from_positions(&[closed(Side::Buy, 0, 100.0, 105.0)]);
        ledger.extend_positions(&[closed(Side::Buy, 3, 100.0, 102.0)]);
        assert_eq!(ledger.final_balance(), 7.0);
    }

    #[test]
    fn offset_moves_bar_indices_only() {
        let mut ledger = Ledger::from_positions(&[closed(Side::Buy, 2, 100.0, 101.0)]);
        ledger.offset_bars(100);
        let row = &ledger.rows()[0];
        assert_eq!((row.entry_bar, row.exit_bar), (102, 103));
        assert_eq!(row.balance, 1.0);
    }

    #[test]
    fn row_carries_position_fields() {
        let ledger = Ledger::from_positions(&[closed(Side::Sell, 0, 100.0, 97.0)]);
        let row = &ledger.rows()[0];
        assert_eq!(row.side, Side::Sell);
        assert_eq!(row.entry_price, 100.0);
        assert_eq!(row.exit_price, 97.0);
        assert_eq!(row.operating_time_ms, 60_000);
        assert_eq!(row.exit_reason, ExitReason::SignalReversal);
        assert!(row.is_winner());
    }

    #[test]
    fn serializes_as_plain_row_array() {
        let ledger = Ledger::from_positions(&[closed(Side::Buy, 0, 100.0, 101.0)]);
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.starts_with('['));
        let back: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }
}
