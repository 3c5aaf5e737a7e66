//! Bar loading for the runner: CSV files and synthetic random walks.
//!
//! CSV layout: a header row, then one bar (or tick) per row.
//! - `timestamp` is required and parsed with the configured format.
//! - `open`, `high`, `low`, `close` are required, except in tick files that
//!   carry `last`: any missing OHLC column then mirrors `last`.
//! - `bid`, `ask`, `last` are optional quotes; an empty cell means absent.
//! - Every other column is a flag column when all its cells read `true` or
//!   `false`, otherwise a numeric column where an empty cell reads as NaN.
//!
//! Synthetic data is a developer-only smoke mode. Results produced on it are
//! tagged through [`DataSource::Synthetic`].

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use pipsim_core::domain::Bar;
use pipsim_core::fingerprint::{dataset_hash, Fingerprint};

use crate::config::SyntheticConfig;

const QUOTE_COLUMNS: [&str; 3] = ["bid", "ask", "last"];
const OHLC_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse timestamp '{value}' with format '{format}'")]
    InvalidTimestamp {
        row: usize,
        value: String,
        format: String,
    },

    #[error("row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
}

/// Where a bar sequence came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { seed: u64 },
    /// Bars handed over in memory by the caller.
    Memory,
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic { .. })
    }
}

/// Result of loading bars, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    pub dataset_hash: Fingerprint,
}

impl LoadedData {
    pub fn new(bars: Vec<Bar>, source: DataSource) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            source,
            dataset_hash,
        }
    }
}

/// Load a CSV bar file.
pub fn load_csv(path: &Path, timestamp_format: &str) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(file, timestamp_format)?;
    info!(path = %path.display(), bars = bars.len(), "loaded bar file");
    Ok(LoadedData::new(
        bars,
        DataSource::Csv {
            path: path.to_path_buf(),
        },
    ))
}

/// Per-column role, decided once from the header and the full column contents.
enum Role {
    Timestamp,
    Price(usize),
    Quote(usize),
    Flag(String),
    Numeric(String),
}

/// Parse bars from any CSV reader.
pub fn read_bars<R: Read>(reader: R, timestamp_format: &str) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let records = rdr.records().collect::<Result<Vec<_>, _>>()?;

    let has = |name: &str| headers.iter().any(|h| h == name);
    if !has("timestamp") {
        return Err(LoadError::MissingColumn("timestamp"));
    }
    if !has("last") {
        for name in OHLC_COLUMNS {
            if !has(name) {
                return Err(LoadError::MissingColumn(name));
            }
        }
    }

    let roles: Vec<Role> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if name == "timestamp" {
                Role::Timestamp
            } else if let Some(k) = OHLC_COLUMNS.iter().position(|c| *c == name) {
                Role::Price(k)
            } else if let Some(k) = QUOTE_COLUMNS.iter().position(|c| *c == name) {
                Role::Quote(k)
            } else if !records.is_empty() && records.iter().all(|r| parse_flag(&r[i]).is_some()) {
                Role::Flag(name.to_string())
            } else {
                Role::Numeric(name.to_string())
            }
        })
        .collect();

    let mut bars = Vec::with_capacity(records.len());
    for (n, record) in records.iter().enumerate() {
        // 1-based data row, header excluded.
        let row = n + 1;
        let mut timestamp = None;
        let mut ohlc = [None; 4];
        let mut quotes = [None; 3];
        let mut bar = Bar::new(NaiveDateTime::default(), f64::NAN, f64::NAN, f64::NAN, f64::NAN);

        for (role, (cell, name)) in roles.iter().zip(record.iter().zip(headers.iter())) {
            match role {
                Role::Timestamp => {
                    timestamp = Some(parse_timestamp(cell, timestamp_format).ok_or_else(|| {
                        LoadError::InvalidTimestamp {
                            row,
                            value: cell.to_string(),
                            format: timestamp_format.to_string(),
                        }
                    })?);
                }
                Role::Price(k) => ohlc[*k] = Some(parse_number(cell, name, row)?),
                Role::Quote(k) => {
                    quotes[*k] = if cell.is_empty() {
                        None
                    } else {
                        Some(parse_number(cell, name, row)?)
                    };
                }
                Role::Flag(column) => {
                    if let Some(flag) = parse_flag(cell) {
                        bar.flags.insert(column.clone(), flag);
                    }
                }
                Role::Numeric(column) => {
                    bar.columns.insert(column.clone(), parse_number(cell, name, row)?);
                }
            }
        }

        let [bid, ask, last] = quotes;
        let fallback = last.unwrap_or(f64::NAN);
        let [open, high, low, close] = ohlc.map(|v| v.unwrap_or(fallback));
        bar.timestamp = timestamp.ok_or(LoadError::MissingColumn("timestamp"))?;
        bar.open = open;
        bar.high = high;
        bar.low = low;
        bar.close = close;
        bar.bid = bid;
        bar.ask = ask;
        bar.last = last;
        bars.push(bar);
    }

    Ok(bars)
}

/// Configured format first, then a bare date at midnight.
fn parse_timestamp(value: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_flag(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_number(cell: &str, column: &str, row: usize) -> Result<f64, LoadError> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| LoadError::InvalidNumber {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    })
}

/// Generate a seeded random walk with quotes and raw buy/sell flags.
///
/// Each bar carries `buy`/`sell` flag columns and a numeric `signal` column
/// (+1 buy, -1 sell, 0 none), so both signal source types can run on it.
/// The same config always yields the same bars.
pub fn generate_synthetic(config: &SyntheticConfig) -> LoadedData {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(config.seed);
    let half_spread = config.spread / 2.0;
    let mut price = config.start_price;
    let mut bars = Vec::with_capacity(config.bars);

    for i in 0..config.bars {
        let open = price;
        let close = open + rng.gen_range(-config.max_move..=config.max_move);
        let high = open.max(close) + rng.gen_range(0.0..=config.max_move / 2.0);
        let low = open.min(close) - rng.gen_range(0.0..=config.max_move / 2.0);

        let (buy, sell) = if rng.gen_bool(config.signal_rate.clamp(0.0, 1.0)) {
            let is_buy = rng.gen_bool(0.5);
            (is_buy, !is_buy)
        } else {
            (false, false)
        };
        let signal = match (buy, sell) {
            (true, _) => 1.0,
            (_, true) => -1.0,
            _ => 0.0,
        };

        let timestamp = config.start + chrono::Duration::seconds(config.step_secs * i as i64);
        let mut bar = Bar::new(timestamp, open, high, low, close)
            .with_flag("buy", buy)
            .with_flag("sell", sell)
            .with_column("signal", signal);
        bar.bid = Some(close - half_spread);
        bar.ask = Some(close + half_spread);
        bar.last = Some(close);
        bars.push(bar);

        price = close;
    }

    info!(
        bars = bars.len(),
        seed = config.seed,
        "generated synthetic bars"
    );
    LoadedData::new(bars, DataSource::Synthetic { seed: config.seed })
}
