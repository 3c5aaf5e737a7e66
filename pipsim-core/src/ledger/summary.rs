//! Ledger summary statistics: pure functions over the trade table.

use crate::domain::ExitReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::LedgerRow;

/// Aggregate statistics for a ledger, all in pips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub trade_count: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub total_pips: f64,
    pub avg_pips: f64,
    pub best_pips: f64,
    pub worst_pips: f64,
    pub profit_factor: f64,
    /// Largest peak-to-trough drop of the balance curve (a positive number).
    pub max_drawdown_pips: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_operating_secs: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
}

impl LedgerSummary {
    pub fn compute(rows: &[LedgerRow]) -> Self {
        let trade_count = rows.len();
        let winners = rows.iter().filter(|r| r.pips > 0.0).count();
        let losers = rows.iter().filter(|r| r.pips < 0.0).count();
        let total_pips: f64 = rows.iter().map(|r| r.pips).sum();

        let mut exit_reasons = BTreeMap::new();
        for row in rows {
            *exit_reasons.entry(row.exit_reason).or_default() += 1;
        }

        Self {
            trade_count,
            winners,
            losers,
            win_rate: ratio(winners as f64, trade_count),
            total_pips,
            avg_pips: ratio(total_pips, trade_count),
            best_pips: rows.iter().map(|r| r.pips).fold(0.0, f64::max),
            worst_pips: rows.iter().map(|r| r.pips).fold(0.0, f64::min),
            profit_factor: profit_factor(rows),
            max_drawdown_pips: max_drawdown(rows),
            max_consecutive_wins: max_consecutive(rows, true),
            max_consecutive_losses: max_consecutive(rows, false),
            avg_operating_secs: ratio(
                rows.iter().map(|r| r.operating_time_ms as f64 / 1000.0).sum(),
                trade_count,
            ),
            exit_reasons,
        }
    }
}

fn ratio(numerator: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator / count as f64
    }
}

/// Gross winning pips / gross losing pips.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(rows: &[LedgerRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = rows.iter().filter(|r| r.pips > 0.0).map(|r| r.pips).sum();
    let gross_loss: f64 = rows
        .iter()
        .filter(|r| r.pips < 0.0)
        .map(|r| r.pips.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Max drawdown of the balance curve, measured from a starting balance of zero.
pub fn max_drawdown(rows: &[LedgerRow]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for row in rows {
        peak = peak.max(row.balance);
        max_dd = max_dd.max(peak - row.balance);
    }
    max_dd
}

/// Longest run of winners (`winners == true`) or non-winners.
fn max_consecutive(rows: &[LedgerRow], winners: bool) -> usize {
    let mut best = 0;
    let mut current = 0;
    for row in rows {
        if row.is_winner() == winners {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}
