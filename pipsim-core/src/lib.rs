//! PipSim Core: domain types, signal components, simulation engine, ledger.
//!
//! This crate contains the heart of the trade simulator:
//! - Domain types (bars, sides, positions with their pip bookkeeping)
//! - Signal sources and the buy/sell debouncer
//! - Risk policy (take profit, stop loss, trailing stop)
//! - Bar-by-bar simulation engine with exit-then-entry phases per bar
//! - Ledger with running balance and summary statistics
//! - Run fingerprinting for determinism checks

pub mod components;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod ledger;
