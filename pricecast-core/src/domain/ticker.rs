//! Ticker symbols.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper-case exchange symbol, e.g. `AAPL` or `BRK.B`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickerError {
    #[error("ticker symbol is empty")]
    Empty,

    #[error("ticker '{0}' is longer than 12 characters")]
    TooLong(String),

    #[error("ticker '{symbol}' contains invalid character '{ch}'")]
    InvalidChar { symbol: String, ch: char },
}

impl Ticker {
    /// Parse and normalize a symbol (trimmed, upper-cased).
    pub fn new(symbol: &str) -> Result<Self, TickerError> {
        let s = symbol.trim().to_ascii_uppercase();
        if s.is_empty() {
            return Err(TickerError::Empty);
        }
        if s.len() > 12 {
            return Err(TickerError::TooLong(s));
        }
        if let Some(ch) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
        {
            return Err(TickerError::InvalidChar { symbol: s, ch });
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ticker {
    type Err = TickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ticker {
    type Error = TickerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Ticker> for String {
    fn from(t: Ticker) -> Self {
        t.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let t = Ticker::new("  msft ").unwrap();
        assert_eq!(t.as_str(), "MSFT");
    }

    #[test]
    fn accepts_class_suffix() {
        assert_eq!(Ticker::new("brk.b").unwrap().as_str(), "BRK.B");
    }

    #[test]
    fn rejects_empty_and_bad_chars() {
        assert_eq!(Ticker::new("   "), Err(TickerError::Empty));
        assert!(matches!(
            Ticker::new("AA PL"),
            Err(TickerError::InvalidChar { ch: ' ', .. })
        ));
        assert!(matches!(
            Ticker::new("X'; DROP TABLE"),
            Err(TickerError::InvalidChar { .. })
        ));
    }

    #[test]
    fn serde_goes_through_validation() {
        let t: Ticker = serde_json::from_str("\"goog\"").unwrap();
        assert_eq!(t.as_str(), "GOOG");
        assert!(serde_json::from_str::<Ticker>("\"\"").is_err());
    }
}
