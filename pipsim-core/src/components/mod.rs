//! Strategy components around the engine: signal sources, debouncing, risk policy.

pub mod debounce;
pub mod risk;
pub mod signal;

pub use debounce::{debounce, SignalDebouncer};
pub use risk::RiskPolicy;
pub use signal::{ColumnSignal, FlagSignal, FnSignal, SignalError, SignalSeries, SignalSource};
