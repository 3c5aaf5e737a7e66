//! Bar-by-bar simulation loop: the heart of the engine.
//!
//! Per bar, strictly in order:
//! 1. Exit check: mark the open position, evaluate the risk policy and signal
//!    reversal, close on the first rule that fires.
//! 2. Entry check: with the slot free (and re-entry permitted), open on an
//!    allowed signal.
//!
//! After the last bar an open position is force-closed with zero slippage.

use crate::components::SignalSource;
use crate::domain::{Bar, ExitReason, Position};
use tracing::{debug, info};

use super::config::{PriceRule, ReentryPolicy, SimulationConfig};
use super::error::SimulationError;
use super::state::{EngineState, RunAborted, RunResult};

/// Single-instrument, single-position trade simulator.
///
/// Construction validates the configuration and resolves the price rule; a
/// constructed engine can run any number of independent bar sequences.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    config: SimulationConfig,
    price: PriceRule,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let price = PriceRule::resolve(&config.price);
        Ok(Self { config, price })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the simulation over `bars`.
    ///
    /// The signal source is reset first, so reusing one source across runs
    /// never leaks history. On failure the positions closed so far are
    /// returned inside [`RunAborted`].
    pub fn run(
        &self,
        bars: &[Bar],
        signal: &mut dyn SignalSource,
    ) -> Result<RunResult, RunAborted> {
        signal.reset();
        let mut state = EngineState::new();

        info!(
            bars = bars.len(),
            signal = %signal.name(),
            "starting simulation run"
        );

        for t in 0..bars.len() {
            state.bar_index = t;
            if let Err(error) = self.step(bars, t, signal, &mut state) {
                return Err(state.abort(error));
            }
        }

        if let Err(error) = self.close_at_end(bars, &mut state) {
            return Err(state.abort(error));
        }

        info!(
            positions = state.closed.len(),
            signals = state.signal_count,
            "simulation run finished"
        );

        Ok(RunResult {
            positions: state.closed,
            bar_count: bars.len(),
            warmup_bars: self.config.warmup_bars.min(bars.len()),
            signal_count: state.signal_count,
            skipped_entries: state.skipped_entries,
        })
    }

    fn step(
        &self,
        bars: &[Bar],
        t: usize,
        signal: &mut dyn SignalSource,
        state: &mut EngineState,
    ) -> Result<(), SimulationError> {
        let bar = &bars[t];

        if let Some(prev) = state.last_timestamp {
            if bar.timestamp < prev {
                return Err(SimulationError::OutOfOrder {
                    bar_index: t,
                    timestamp: bar.timestamp,
                });
            }
        }
        state.last_timestamp = Some(bar.timestamp);

        // Evaluated on warmup bars too, so stateful sources see the whole history.
        let sig = signal
            .evaluate(bars, t)
            .map_err(|error| SimulationError::Signal {
                bar_index: t,
                source_name: signal.name(),
                error,
            })?;

        let in_warmup = t < self.config.warmup_bars;
        if sig.is_some() && !in_warmup {
            state.signal_count += 1;
        }

        // ── Exit check ──
        let mut closed_this_bar = false;
        if let Some(mut pos) = state.open.take() {
            let mark = self.price.exit(bar, t, pos.side())?;
            pos.compute(mark);

            match self.config.risk.exit_decision(&pos, sig) {
                Some(reason) => {
                    pos.close(bar.timestamp, t, mark, self.config.slippage, reason)?;
                    debug!(
                        bar = t,
                        side = %pos.side(),
                        pips = pos.pips(),
                        reason = reason.as_str(),
                        "position closed"
                    );
                    state.closed.push(pos);
                    closed_this_bar = true;
                }
                None => state.open = Some(pos),
            }
        }

        // ── Entry check ──
        let slot_free = state.open.is_none()
            && (!closed_this_bar || self.config.reentry == ReentryPolicy::SameBar);
        if !slot_free || in_warmup {
            return Ok(());
        }

        if let Some(side) = sig {
            if !self.config.allowed_sides.contains(&side) {
                state.skipped_entries += 1;
                return Ok(());
            }
            let price = self.price.entry(bar, t, side)?;
            let pos = Position::open(side, bar.timestamp, t, price, self.config.slippage);
            debug!(
                bar = t,
                side = %side,
                entry_price = pos.entry_price(),
                "position opened"
            );
            state.open = Some(pos);
        }

        Ok(())
    }

    /// Termination rule: every run ends with a fully realized ledger.
    fn close_at_end(&self, bars: &[Bar], state: &mut EngineState) -> Result<(), SimulationError> {
        let (Some(last), Some(mut pos)) = (bars.last(), state.open.take()) else {
            return Ok(());
        };
        let t = bars.len() - 1;
        let price = self.price.final_exit(last, t, pos.side())?;
        pos.close(last.timestamp, t, price, 0.0, ExitReason::EndOfData)?;
        debug!(bar = t, side = %pos.side(), pips = pos.pips(), "position force-closed at end of data");
        state.closed.push(pos);
        Ok(())
    }
}

/// Build an engine from `config` and run it once.
pub fn simulate(
    config: SimulationConfig,
    bars: &[Bar],
    signal: &mut dyn SignalSource,
) -> Result<RunResult, RunAborted> {
    SimulationEngine::new(config)?.run(bars, signal)
}
