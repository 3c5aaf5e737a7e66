//! TOML simulation file: data source, signal source, risk and execution settings.
//!
//! The file maps onto [`SimulationConfig`] plus the runner-only concerns
//! (where bars come from, how they are split into sessions, which signal
//! source reads them). Everything is validated before any data is loaded.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pipsim_core::components::{ColumnSignal, FlagSignal, RiskPolicy, SignalSource};
use pipsim_core::domain::{InvalidSide, Side};
use pipsim_core::engine::{self, PriceSource, ReentryPolicy, SimulationConfig};

/// Errors from reading or validating a simulation file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[execution] sides: {0}")]
    Side(#[from] InvalidSide),

    #[error(transparent)]
    Simulation(#[from] engine::ConfigError),

    #[error("no data source: set [data] path or add a [data.synthetic] table")]
    NoDataSource,

    #[error("[signal] {field} must not be empty")]
    EmptySignalColumn { field: &'static str },

    #[error("[data.synthetic] {field} is out of range: {value}")]
    InvalidSynthetic { field: &'static str, value: f64 },
}

/// Top-level TOML document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationFile {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub risk: RiskPolicy,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// `[data]`: where bars come from and how they are cut into sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default)]
    pub session: SessionSplit,
    #[serde(default)]
    pub synthetic: Option<SyntheticConfig>,
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            timestamp_format: default_timestamp_format(),
            session: SessionSplit::default(),
            synthetic: None,
        }
    }
}

/// How a bar file is split into independent simulation runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSplit {
    /// The whole file is one run.
    #[default]
    Whole,
    /// One run per calendar day of the bar timestamps.
    Daily,
}

/// `[data.synthetic]`: seeded random walk used for smoke runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    #[serde(default = "default_synthetic_bars")]
    pub bars: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_synthetic_start")]
    pub start: NaiveDateTime,
    /// Seconds between consecutive bars.
    #[serde(default = "default_step_secs")]
    pub step_secs: i64,
    #[serde(default = "default_start_price")]
    pub start_price: f64,
    /// Largest per-bar move, in pips.
    #[serde(default = "default_max_move")]
    pub max_move: f64,
    /// Bid/ask spread, in pips.
    #[serde(default = "default_spread")]
    pub spread: f64,
    /// Probability that a bar raises a raw buy or sell flag.
    #[serde(default = "default_signal_rate")]
    pub signal_rate: f64,
}

fn default_synthetic_bars() -> usize {
    1_000
}

fn default_seed() -> u64 {
    42
}

fn default_synthetic_start() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2022, 1, 3)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap_or_default()
}

fn default_step_secs() -> i64 {
    60
}

fn default_start_price() -> f64 {
    100.0
}

fn default_max_move() -> f64 {
    0.5
}

fn default_spread() -> f64 {
    0.2
}

fn default_signal_rate() -> f64 {
    0.05
}

/// Upper bound for `max_move` and `spread`, in pips.
const MAX_SYNTHETIC_MOVE: f64 = 1e9;

impl SyntheticConfig {
    /// Timestamp of the last generated bar, if it fits chrono's range.
    fn last_timestamp(&self) -> Option<NaiveDateTime> {
        let steps = i64::try_from(self.bars.saturating_sub(1)).ok()?;
        let span = chrono::Duration::try_seconds(self.step_secs.checked_mul(steps)?)?;
        self.start.checked_add_signed(span)
    }

    pub fn with_bars(bars: usize) -> Self {
        Self {
            bars,
            ..Self::default()
        }
    }

    /// Every field must keep the generated walk and its timestamps representable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (
                "step_secs",
                self.step_secs as f64,
                self.step_secs > 0 && self.last_timestamp().is_some(),
            ),
            ("start_price", self.start_price, self.start_price.is_finite()),
            (
                "max_move",
                self.max_move,
                (0.0..=MAX_SYNTHETIC_MOVE).contains(&self.max_move),
            ),
            (
                "spread",
                self.spread,
                (0.0..=MAX_SYNTHETIC_MOVE).contains(&self.spread),
            ),
            (
                "signal_rate",
                self.signal_rate,
                (0.0..=1.0).contains(&self.signal_rate),
            ),
        ];
        for (field, value, ok) in checks {
            if !ok {
                return Err(ConfigError::InvalidSynthetic { field, value });
            }
        }
        Ok(())
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: default_synthetic_bars(),
            seed: default_seed(),
            start: default_synthetic_start(),
            step_secs: default_step_secs(),
            start_price: default_start_price(),
            max_move: default_max_move(),
            spread: default_spread(),
            signal_rate: default_signal_rate(),
        }
    }
}

/// `[signal]`: which bar columns produce the per-bar signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalConfig {
    /// Raw boolean buy/sell flag columns, debounced.
    Flags {
        #[serde(default = "default_buy_column")]
        buy: String,
        #[serde(default = "default_sell_column")]
        sell: String,
    },
    /// One numeric column: positive buys, negative sells.
    Column { column: String },
}

fn default_buy_column() -> String {
    "buy".to_string()
}

fn default_sell_column() -> String {
    "sell".to_string()
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig::Flags {
            buy: default_buy_column(),
            sell: default_sell_column(),
        }
    }
}

impl SignalConfig {
    /// A fresh signal source. Each session gets its own.
    pub fn build(&self) -> Box<dyn SignalSource + Send> {
        match self {
            SignalConfig::Flags { buy, sell } => Box::new(FlagSignal::new(buy, sell)),
            SignalConfig::Column { column } => Box::new(ColumnSignal::new(column)),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let columns: Vec<(&'static str, &str)> = match self {
            SignalConfig::Flags { buy, sell } => vec![("buy", buy.as_str()), ("sell", sell.as_str())],
            SignalConfig::Column { column } => vec![("column", column.as_str())],
        };
        for (field, value) in columns {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptySignalColumn { field });
            }
        }
        Ok(())
    }
}

/// `[execution]`: slippage, pricing and entry rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub slippage: f64,
    #[serde(default)]
    pub price: PriceSource,
    #[serde(default)]
    pub reentry: ReentryPolicy,
    /// Side names (`buy`/`long`, `sell`/`short`); parsed during validation.
    #[serde(default = "default_side_names")]
    pub sides: Vec<String>,
    #[serde(default)]
    pub warmup_bars: usize,
}

fn default_side_names() -> Vec<String> {
    vec!["buy".to_string(), "sell".to_string()]
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage: 0.0,
            price: PriceSource::default(),
            reentry: ReentryPolicy::default(),
            sides: default_side_names(),
            warmup_bars: 0,
        }
    }
}

impl SimulationFile {
    /// Parse from a TOML string. Does not validate.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file. Does not validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// The engine configuration described by `[risk]` and `[execution]`, validated.
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        let sides = self
            .execution
            .sides
            .iter()
            .map(|s| s.parse::<Side>())
            .collect::<Result<Vec<_>, _>>()?;

        let config = SimulationConfig::default()
            .with_risk(self.risk)
            .with_slippage(self.execution.slippage)
            .with_price(self.execution.price.clone())
            .with_reentry(self.execution.reentry)
            .with_sides(dedup_sides(sides))
            .with_warmup(self.execution.warmup_bars);
        config.validate()?;
        Ok(config)
    }

    /// Check the whole file: engine settings, signal columns, data source.
    pub fn validate(&self) -> Result<SimulationConfig, ConfigError> {
        let config = self.simulation_config()?;
        self.signal.validate()?;
        match (&self.data.path, &self.data.synthetic) {
            (None, None) => return Err(ConfigError::NoDataSource),
            (_, Some(synthetic)) => synthetic.validate()?,
            _ => {}
        }
        Ok(config)
    }
}

/// Keep the first occurrence of each side, in order.
fn dedup_sides(sides: Vec<Side>) -> Vec<Side> {
    let mut out = Vec::with_capacity(2);
    for side in sides {
        if !out.contains(&side) {
            out.push(side);
        }
    }
    out
}
