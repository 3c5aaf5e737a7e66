use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Direction of a position. "No signal" is `Option::<Side>::None`, never a `Side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Signed P&L of moving from `from` to `to` in this direction.
    pub fn pips(self, from: f64, to: f64) -> f64 {
        match self {
            Side::Buy => to - from,
            Side::Sell => from - to,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Text that names neither side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid side '{0}': expected BUY or SELL")]
pub struct InvalidSide(pub String);

impl FromStr for Side {
    type Err = InvalidSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Ok(Side::Buy),
            "sell" | "short" => Ok(Side::Sell),
            _ => Err(InvalidSide(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("BUY".parse::<Side>(), Ok(Side::Buy));
        assert_eq!(" sell ".parse::<Side>(), Ok(Side::Sell));
        assert_eq!("Long".parse::<Side>(), Ok(Side::Buy));
    }

    #[test]
    fn rejects_neutral_text() {
        let err = "hold".parse::<Side>().unwrap_err();
        assert_eq!(err, InvalidSide("hold".into()));
        assert!(err.to_string().contains("hold"));
    }

    #[test]
    fn pips_sign_follows_direction() {
        assert_eq!(Side::Buy.pips(100.0, 108.0), 8.0);
        assert_eq!(Side::Sell.pips(100.0, 108.0), -8.0);
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
    }
}
