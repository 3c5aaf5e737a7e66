//! Simulation runner: wires together config, data, engine, sweep and ledger.
//!
//! Two entry points:
//! - `run_simulation()`: loads bars as the file says, then runs. Used by the CLI.
//! - `run_on_data()`: takes pre-loaded bars. Used by tests and callers that
//!   already hold data in memory.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use pipsim_core::domain::{Bar, Side};
use pipsim_core::engine::{PriceSource, SimulationEngine, SimulationError};
use pipsim_core::fingerprint::{ledger_hash, RunFingerprint};
use pipsim_core::ledger::{reversal_pips, Ledger, LedgerSummary};

use crate::config::{ConfigError, SimulationFile};
use crate::data_loader::{generate_synthetic, load_csv, DataSource, LoadError, LoadedData};
use crate::sweep::{
    run_sessions, split_sessions, SessionFailure, SessionReport, SweepError, SweepPolicy,
};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] SimulationError),
    #[error(transparent)]
    Session(#[from] SweepError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one simulation run over a bar file.
///
/// The ledger is kept out of the serialized report; it is persisted on its
/// own as `ledger.json` / `ledger.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub summary: LedgerSummary,
    pub fingerprint: RunFingerprint,
    pub data_source: DataSource,
    pub bar_count: usize,
    pub signal_count: usize,
    pub skipped_entries: usize,
    /// Signal-to-signal estimate over the whole file, ignoring risk rules and slippage.
    pub reversal_estimate_pips: f64,
    pub sessions: Vec<SessionReport>,
    pub failures: Vec<SessionFailure>,
    #[serde(skip)]
    pub ledger: Ledger,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunReport {
    pub fn is_synthetic(&self) -> bool {
        self.data_source.is_synthetic()
    }
}

/// Load the bars a simulation file points at.
///
/// A `[data] path` wins over `[data.synthetic]` when both are present.
pub fn load_data(file: &SimulationFile) -> Result<LoadedData, RunError> {
    match (&file.data.path, &file.data.synthetic) {
        (Some(path), _) => Ok(load_csv(path, &file.data.timestamp_format)?),
        (None, Some(synthetic)) => Ok(generate_synthetic(synthetic)),
        (None, None) => Err(ConfigError::NoDataSource.into()),
    }
}

/// Validate, load and run a simulation file.
pub fn run_simulation(file: &SimulationFile, policy: SweepPolicy) -> Result<RunReport, RunError> {
    file.validate()?;
    let data = load_data(file)?;
    run_on_data(file, data, policy)
}

/// Run a simulation file against pre-loaded bars, with no I/O.
pub fn run_on_data(
    file: &SimulationFile,
    data: LoadedData,
    policy: SweepPolicy,
) -> Result<RunReport, RunError> {
    let config = file.simulation_config()?;
    let engine = SimulationEngine::new(config.clone())?;
    let bars = &data.bars;

    let sessions = split_sessions(bars, file.data.session);
    info!(
        bars = bars.len(),
        sessions = sessions.len(),
        config_hash = %config.config_hash(),
        "starting simulation"
    );

    let mut outcome = run_sessions(&engine, bars, &sessions, || file.signal.build(), policy)?;
    let reversal_estimate_pips = reversal_estimates(file, bars, &mut outcome.sessions);

    let summary = outcome.ledger.summary();
    // Dataset hash was taken at load time.
    let fingerprint = RunFingerprint {
        config_hash: config.config_hash(),
        dataset_hash: data.dataset_hash.clone(),
        ledger_hash: ledger_hash(&outcome.positions),
        bar_count: bars.len(),
        position_count: outcome.positions.len(),
    };

    info!(
        trades = summary.trade_count,
        total_pips = summary.total_pips,
        failed_sessions = outcome.failures.len(),
        ledger_hash = %fingerprint.ledger_hash,
        "simulation finished"
    );

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        summary,
        fingerprint,
        data_source: data.source,
        bar_count: bars.len(),
        signal_count: outcome.signal_count(),
        skipped_entries: outcome.skipped_entries(),
        reversal_estimate_pips,
        sessions: outcome.sessions,
        failures: outcome.failures,
        ledger: outcome.ledger,
    })
}

/// Fill in each completed session's signal-to-signal estimate and return the sum.
///
/// Failed sessions are not walked. A session whose estimate cannot be priced
/// keeps `None` and is logged; the estimate never fails a run.
fn reversal_estimates(file: &SimulationFile, bars: &[Bar], sessions: &mut [SessionReport]) -> f64 {
    let mut total = 0.0;
    for session in sessions.iter_mut() {
        match session_reversal_estimate(file, bars, session.start..session.end) {
            Ok(pips) => {
                session.reversal_estimate_pips = Some(pips);
                total += pips;
            }
            Err(error) => warn!(
                session = session.index,
                error = %error,
                "reversal estimate unavailable for session"
            ),
        }
    }
    total
}

/// Estimate for one session, priced from the single field (or `close` for
/// quote-based pricing). Error bar indices are file-global.
fn session_reversal_estimate(
    file: &SimulationFile,
    bars: &[Bar],
    range: Range<usize>,
) -> Result<f64, SimulationError> {
    let field = match &file.execution.price {
        PriceSource::SingleField { field } => field.as_str(),
        PriceSource::BidAsk | PriceSource::Mid => "close",
    };

    let session = &bars[range.clone()];
    let mut source = file.signal.build();
    let signals = (0..session.len())
        .map(|i| {
            source
                .evaluate(session, i)
                .map_err(|error| SimulationError::Signal {
                    bar_index: range.start + i,
                    source_name: source.name(),
                    error,
                })
        })
        .collect::<Result<Vec<Option<Side>>, _>>()?;

    reversal_pips(session, &signals, field).map_err(|error| match error {
        SimulationError::MissingPriceData { bar_index, field } => {
            SimulationError::MissingPriceData {
                bar_index: range.start + bar_index,
                field,
            }
        }
        other => other,
    })
}
