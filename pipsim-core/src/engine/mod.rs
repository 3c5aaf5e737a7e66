//! Simulation engine: bar-by-bar state machine and supporting types.
//!
//! The engine consumes an ordered bar sequence and a signal source, and runs
//! the two-phase bar loop (exit check, then entry check). Output is the
//! ordered position sequence of the run, every position closed.

pub mod config;
pub mod error;
pub mod loop_runner;
pub mod state;

pub use config::{PriceSource, ReentryPolicy, SimulationConfig};
pub use error::{ConfigError, SimulationError};
pub use loop_runner::{simulate, SimulationEngine};
pub use state::{EngineState, RunAborted, RunResult};
