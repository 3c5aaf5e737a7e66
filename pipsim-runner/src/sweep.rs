//! Session sweep: split a bar sequence into independent runs and execute them in parallel.
//!
//! Every session gets its own signal source and shares nothing mutable with
//! the others, so sessions run on the rayon pool. Results are always
//! reassembled in session (chronological) order.

use std::ops::Range;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use pipsim_core::components::SignalSource;
use pipsim_core::domain::{Bar, Position};
use pipsim_core::engine::{RunAborted, RunResult, SimulationEngine};
use pipsim_core::ledger::Ledger;

use crate::config::SessionSplit;

/// What to do when one session aborts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPolicy {
    /// Stop the sweep with the first failed session.
    #[default]
    FailFast,
    /// Record the failure, leave the session out of the ledger, carry on.
    Continue,
}

/// A session aborted under [`SweepPolicy::FailFast`].
#[derive(Debug, Error)]
#[error("session {session} (bars {start}..{end}) failed: {source}")]
pub struct SweepError {
    pub session: usize,
    pub start: usize,
    pub end: usize,
    #[source]
    pub source: RunAborted,
}

/// Per-session statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub index: usize,
    /// Calendar day of the session's first bar.
    pub date: Option<NaiveDate>,
    pub start: usize,
    pub end: usize,
    pub positions: usize,
    pub pips: f64,
    pub signal_count: usize,
    pub skipped_entries: usize,
    /// Signal-to-signal estimate for this session; filled in by the runner.
    #[serde(default)]
    pub reversal_estimate_pips: Option<f64>,
}

/// A session skipped under [`SweepPolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub start: usize,
    pub end: usize,
    /// Global index of the bar that failed.
    pub bar_index: usize,
    pub error: String,
    /// Positions the session had closed before it failed; not in the ledger.
    pub closed_before_failure: usize,
}

/// Concatenated outcome of all sessions.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Closed positions of every successful session, in order.
    pub positions: Vec<Position>,
    /// Ledger with file-global bar indices and a balance running across sessions.
    pub ledger: Ledger,
    pub sessions: Vec<SessionReport>,
    pub failures: Vec<SessionFailure>,
}

impl SweepOutcome {
    pub fn signal_count(&self) -> usize {
        self.sessions.iter().map(|s| s.signal_count).sum()
    }

    pub fn skipped_entries(&self) -> usize {
        self.sessions.iter().map(|s| s.skipped_entries).sum()
    }
}

/// Bar ranges for each session. Empty input gives no sessions.
///
/// Daily splitting groups consecutive bars with the same calendar date; bars
/// are assumed ordered, so a date never reappears after its session ends.
pub fn split_sessions(bars: &[Bar], split: SessionSplit) -> Vec<Range<usize>> {
    if bars.is_empty() {
        return Vec::new();
    }
    match split {
        SessionSplit::Whole => vec![0..bars.len()],
        SessionSplit::Daily => {
            let mut sessions = Vec::new();
            let mut start = 0;
            for i in 1..bars.len() {
                if bars[i].timestamp.date() != bars[i - 1].timestamp.date() {
                    sessions.push(start..i);
                    start = i;
                }
            }
            sessions.push(start..bars.len());
            sessions
        }
    }
}

/// Run every session through `engine`, building a fresh signal source per session.
pub fn run_sessions<F>(
    engine: &SimulationEngine,
    bars: &[Bar],
    sessions: &[Range<usize>],
    make_signal: F,
    policy: SweepPolicy,
) -> Result<SweepOutcome, SweepError>
where
    F: Fn() -> Box<dyn SignalSource + Send> + Sync,
{
    info!(sessions = sessions.len(), bars = bars.len(), "running sessions");

    let results: Vec<Result<RunResult, RunAborted>> = sessions
        .par_iter()
        .map(|range| {
            let mut signal = make_signal();
            engine.run(&bars[range.clone()], signal.as_mut())
        })
        .collect();

    let mut outcome = SweepOutcome {
        positions: Vec::new(),
        ledger: Ledger::new(),
        sessions: Vec::new(),
        failures: Vec::new(),
    };
    let mut ledgers = Vec::with_capacity(sessions.len());

    for (index, (range, result)) in sessions.iter().zip(results).enumerate() {
        let date = bars.get(range.start).map(|b| b.timestamp.date());
        match result {
            Ok(run) => {
                let mut ledger = Ledger::from_positions(&run.positions);
                ledger.offset_bars(range.start);
                outcome.sessions.push(SessionReport {
                    index,
                    date,
                    start: range.start,
                    end: range.end,
                    positions: run.positions.len(),
                    pips: run.total_pips(),
                    signal_count: run.signal_count,
                    skipped_entries: run.skipped_entries,
                    reversal_estimate_pips: None,
                });
                outcome.positions.extend(run.positions);
                ledgers.push(ledger);
            }
            Err(aborted) => match policy {
                SweepPolicy::FailFast => {
                    return Err(SweepError {
                        session: index,
                        start: range.start,
                        end: range.end,
                        source: aborted,
                    })
                }
                SweepPolicy::Continue => {
                    warn!(
                        session = index,
                        bar = range.start + aborted.bar_index,
                        error = %aborted.error,
                        "session aborted, skipping"
                    );
                    outcome.failures.push(SessionFailure {
                        index,
                        date,
                        start: range.start,
                        end: range.end,
                        bar_index: range.start + aborted.bar_index,
                        error: aborted.error.to_string(),
                        closed_before_failure: aborted.closed.len(),
                    });
                }
            },
        }
    }

    outcome.ledger = Ledger::concat(ledgers);
    Ok(outcome)
}
