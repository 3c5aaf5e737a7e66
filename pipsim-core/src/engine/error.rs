//! Engine error taxonomy.

use crate::components::SignalError;
use crate::domain::PositionError;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Invalid simulation configuration, detected before any bar is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a finite non-negative distance, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("slippage must be a finite non-negative offset, got {0}")]
    InvalidSlippage(f64),

    #[error("price field name must not be empty")]
    EmptyPriceField,

    #[error("at least one side must be allowed to open positions")]
    NoAllowedSides,
}

/// Errors surfaced by the simulation engine. None are retried or skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    InvalidTransition(#[from] PositionError),

    #[error("bar {bar_index}: price field '{field}' is missing or not a finite number")]
    MissingPriceData { bar_index: usize, field: String },

    #[error("signal source '{source_name}' failed at bar {bar_index}: {error}")]
    Signal {
        bar_index: usize,
        source_name: String,
        #[source]
        error: SignalError,
    },

    #[error("bar {bar_index} at {timestamp} precedes the previous bar")]
    OutOfOrder {
        bar_index: usize,
        timestamp: NaiveDateTime,
    },
}
