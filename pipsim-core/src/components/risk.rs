//! Risk policy: early-exit thresholds evaluated against an open position.
//!
//! All thresholds are distances in pips. Evaluation order is fixed and the
//! first match wins: trailing stop, take profit, stop loss, then signal
//! reversal.

use crate::domain::{ExitReason, Position, Side};
use crate::engine::ConfigError;
use serde::{Deserialize, Serialize};

/// Optional exit thresholds. `None` disables a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    #[serde(default)]
    pub take_profit_pips: Option<f64>,
    #[serde(default)]
    pub stop_loss_pips: Option<f64>,
    #[serde(default)]
    pub trailing_stop_pips: Option<f64>,
}

impl RiskPolicy {
    /// No thresholds: positions only close on reversal or end of data.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_take_profit(mut self, pips: f64) -> Self {
        self.take_profit_pips = Some(pips);
        self
    }

    pub fn with_stop_loss(mut self, pips: f64) -> Self {
        self.stop_loss_pips = Some(pips);
        self
    }

    pub fn with_trailing_stop(mut self, pips: f64) -> Self {
        self.trailing_stop_pips = Some(pips);
        self
    }

    /// Every set threshold must be a finite, non-negative distance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("take_profit_pips", self.take_profit_pips),
            ("stop_loss_pips", self.stop_loss_pips),
            ("trailing_stop_pips", self.trailing_stop_pips),
        ];
        for (name, value) in thresholds {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ConfigError::InvalidThreshold { name, value: v });
                }
            }
        }
        Ok(())
    }

    /// Check the three threshold rules against a freshly marked position.
    pub fn evaluate(&self, position: &Position) -> Option<ExitReason> {
        let pips = position.pips();
        let max_pips = position.max_pips();

        if let Some(trail) = self.trailing_stop_pips {
            if max_pips > trail && max_pips - pips >= trail {
                return Some(ExitReason::TrailingStop);
            }
        }
        if let Some(take) = self.take_profit_pips {
            if pips >= take {
                return Some(ExitReason::TakeProfit);
            }
        }
        if let Some(stop) = self.stop_loss_pips {
            if pips <= -stop {
                return Some(ExitReason::StopLoss);
            }
        }
        None
    }

    /// Full exit decision for one bar: threshold rules, then signal reversal.
    pub fn exit_decision(&self, position: &Position, signal: Option<Side>) -> Option<ExitReason> {
        self.evaluate(position).or_else(|| {
            (signal == Some(position.side().opposite())).then_some(ExitReason::SignalReversal)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.take_profit_pips.is_none()
            && self.stop_loss_pips.is_none()
            && self.trailing_stop_pips.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn long_at(entry: f64) -> Position {
        let ts = NaiveDate::from_ymd_opt(2022, 3, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Position::open(Side::Buy, ts, 0, entry, 0.0)
    }

    #[test]
    fn empty_policy_never_fires() {
        let mut pos = long_at(100.0);
        pos.compute(1_000.0);
        assert_eq!(RiskPolicy::none().evaluate(&pos), None);
        pos.compute(0.0);
        assert_eq!(RiskPolicy::none().evaluate(&pos), None);
    }

    #[test]
    fn take_profit_is_inclusive() {
        let policy = RiskPolicy::none().with_take_profit(8.0);
        let mut pos = long_at(100.0);
        pos.compute(107.9);
        assert_eq!(policy.evaluate(&pos), None);
        pos.compute(108.0);
        assert_eq!(policy.evaluate(&pos), Some(ExitReason::TakeProfit));
    }

    #[test]
    fn stop_loss_is_inclusive() {
        let policy = RiskPolicy::none().with_stop_loss(4.0);
        let mut pos = long_at(100.0);
        pos.compute(96.5);
        assert_eq!(policy.evaluate(&pos), None);
        pos.compute(96.0);
        assert_eq!(policy.evaluate(&pos), Some(ExitReason::StopLoss));
    }

    #[test]
    fn trailing_stop_needs_excursion_beyond_distance() {
        let policy = RiskPolicy::none().with_trailing_stop(3.0);
        let mut pos = long_at(100.0);
        // Best excursion equals the distance: not armed yet.
        pos.compute(103.0);
        pos.compute(99.0);
        assert_eq!(policy.evaluate(&pos), None);

        pos.compute(104.0);
        pos.compute(101.0);
        assert_eq!(policy.evaluate(&pos), Some(ExitReason::TrailingStop));
    }

    #[test]
    fn trailing_stop_outranks_take_profit() {
        let policy = RiskPolicy::none()
            .with_take_profit(2.0)
            .with_trailing_stop(3.0);
        let mut pos = long_at(100.0);
        pos.compute(110.0);
        pos.compute(106.0);
        assert_eq!(policy.evaluate(&pos), Some(ExitReason::TrailingStop));
    }

    #[test]
    fn reversal_checked_after_thresholds() {
        let policy = RiskPolicy::none().with_stop_loss(4.0);
        let mut pos = long_at(100.0);
        pos.compute(95.0);
        assert_eq!(
            policy.exit_decision(&pos, Some(Side::Sell)),
            Some(ExitReason::StopLoss)
        );
        pos.compute(99.0);
        assert_eq!(
            policy.exit_decision(&pos, Some(Side::Sell)),
            Some(ExitReason::SignalReversal)
        );
        assert_eq!(policy.exit_decision(&pos, Some(Side::Buy)), None);
        assert_eq!(policy.exit_decision(&pos, None), None);
    }

    #[test]
    fn validate_rejects_negative_and_nan() {
        assert!(RiskPolicy::none().with_take_profit(8.0).validate().is_ok());
        assert!(RiskPolicy::none().with_stop_loss(-1.0).validate().is_err());
        assert!(RiskPolicy::none()
            .with_trailing_stop(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn deserializes_partial_table() {
        let policy: RiskPolicy = serde_json::from_str(r#"{"take_profit_pips": 8.0}"#).unwrap();
        assert_eq!(policy.take_profit_pips, Some(8.0));
        assert_eq!(policy.stop_loss_pips, None);
        assert!(!policy.is_empty());
    }
}
