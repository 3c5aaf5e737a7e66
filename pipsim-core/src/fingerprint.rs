//! Run fingerprinting: deterministic identification of simulation inputs and outputs.
//!
//! - `config_hash`: the exact simulation configuration.
//! - `dataset_hash`: the bar sequence fed to the engine.
//! - `ledger_hash`: the position sequence it produced.
//!
//! Replaying a run with the same config and data must reproduce the same
//! `ledger_hash`; comparing fingerprints is how determinism is checked.

use crate::domain::{Bar, Position};
use crate::engine::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 digest rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Hash the canonical JSON of `value`.
    ///
    /// Every type hashed here is plain data with string keys, so serialization cannot fail.
    fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        let json = serde_json::to_vec(value).expect("fingerprinted value must serialize");
        Self::from_bytes(&json)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl SimulationConfig {
    pub fn config_hash(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Hash of the bar sequence: timestamps, prices, quotes and derived columns in order.
///
/// Streams fields straight into the hasher; tick files run to millions of rows.
pub fn dataset_hash(bars: &[Bar]) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&value.to_le_bytes());
        }
        for quote in [bar.bid, bar.ask, bar.last] {
            match quote {
                Some(v) => hasher.update(&v.to_le_bytes()),
                None => hasher.update(b"-"),
            };
        }
        for (name, value) in &bar.columns {
            hasher.update(name.as_bytes());
            hasher.update(&value.to_le_bytes());
        }
        for (name, flag) in &bar.flags {
            hasher.update(name.as_bytes());
            hasher.update(&[u8::from(*flag)]);
        }
    }
    Fingerprint(hasher.finalize().to_hex().to_string())
}

pub fn ledger_hash(positions: &[Position]) -> Fingerprint {
    Fingerprint::of(positions)
}

/// Identity of one simulation run: what went in and what came out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: Fingerprint,
    pub dataset_hash: Fingerprint,
    pub ledger_hash: Fingerprint,
    pub bar_count: usize,
    pub position_count: usize,
}

impl RunFingerprint {
    pub fn new(config: &SimulationConfig, bars: &[Bar], positions: &[Position]) -> Self {
        Self {
            config_hash: config.config_hash(),
            dataset_hash: dataset_hash(bars),
            ledger_hash: ledger_hash(positions),
            bar_count: bars.len(),
            position_count: positions.len(),
        }
    }
}
