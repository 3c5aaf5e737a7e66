//! PipSim Runner: simulation orchestration on top of `pipsim-core`.
//!
//! This crate provides:
//! - TOML simulation files mapped onto the engine configuration
//! - CSV bar loading and a seeded synthetic generator
//! - Session splitting and parallel session sweeps
//! - Run reports with fingerprints, and CSV/JSON ledger export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, SessionSplit, SignalConfig, SimulationFile, SyntheticConfig};
pub use data_loader::{generate_synthetic, load_csv, read_bars, DataSource, LoadError, LoadedData};
pub use export::{load_artifacts, save_artifacts};
pub use runner::{load_data, run_on_data, run_simulation, RunError, RunReport, SCHEMA_VERSION};
pub use sweep::{run_sessions, split_sessions, SessionFailure, SessionReport, SweepError, SweepPolicy};
