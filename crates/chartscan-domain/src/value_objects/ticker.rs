use crate::errors::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_TICKER_LEN: usize = 12;

/// Validated, uppercase-normalized symbol identifier. The join key across
/// every per-symbol structure in a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(value: &str) -> Result<Self, ScanError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ScanError::InvalidInput("empty ticker symbol".to_string()));
        }
        if trimmed.len() > MAX_TICKER_LEN {
            return Err(ScanError::InvalidInput(format!(
                "ticker symbol too long: {trimmed}"
            )));
        }
        let normalized = trimmed.to_uppercase();
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(ScanError::InvalidInput(format!(
                "invalid ticker symbol: {trimmed}"
            )));
        }
        Ok(Self(normalized))
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

impl TryFrom<String> for Ticker {
    type Error = ScanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ticker::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_to_uppercase() {
        let ticker = Ticker::parse(" aapl ").unwrap();
        assert_eq!(ticker.as_str(), "AAPL");
    }

    #[test]
    fn parse_accepts_class_share_separators() {
        assert!(Ticker::parse("BRK.B").is_ok());
        assert!(Ticker::parse("RDS-A").is_ok());
    }

    #[test]
    fn parse_rejects_empty_and_garbage() {
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("   ").is_err());
        assert!(Ticker::parse("AA PL").is_err());
        assert!(Ticker::parse("A$PL").is_err());
        assert!(Ticker::parse("TOOLONGFORATICKER").is_err());
    }
}
