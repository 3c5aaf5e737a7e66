//! Quick signal-to-signal profit estimate.
//!
//! Walks a signal series as if every signal flipped an always-in-the-market
//! position: each signal realizes the move since the previous one in the
//! previous direction. No slippage, no risk rules, no ledger. Useful for
//! screening a signal before running the full engine.

use crate::domain::{Bar, Side};
use crate::engine::SimulationError;

/// Total pips of flipping on every signal, priced from `field`.
///
/// `signals` is aligned with `bars` by index; extra entries on either side are ignored.
pub fn reversal_pips(
    bars: &[Bar],
    signals: &[Option<Side>],
    field: &str,
) -> Result<f64, SimulationError> {
    let mut held: Option<(Side, f64)> = None;
    let mut total = 0.0;

    for (i, (bar, signal)) in bars.iter().zip(signals).enumerate() {
        let Some(side) = *signal else {
            continue;
        };
        let price = match bar.field(field) {
            Some(p) if p.is_finite() => p,
            _ => {
                return Err(SimulationError::MissingPriceData {
                    bar_index: i,
                    field: field.to_string(),
                })
            }
        };
        if let Some((prev_side, prev_price)) = held {
            total += prev_side.pips(prev_price, price);
        }
        held = Some((side, price));
    }

    Ok(total)
}
