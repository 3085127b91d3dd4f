use crate::errors::ScanError;
use crate::value_objects::bar::Bar;
use crate::value_objects::ticker::Ticker;
use serde::{Deserialize, Serialize};

/// Bar spacing for a scan's time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarInterval {
    pub label: String,
    pub step_seconds: i64,
}

impl BarInterval {
    pub fn parse(value: &str) -> Result<Self, ScanError> {
        let normalized = value.trim().to_lowercase();
        let (label, step_seconds) = match normalized.as_str() {
            "30m" | "30min" => ("30min", 1_800),
            "1h" | "1hour" => ("1hour", 3_600),
            "4h" | "4hour" => ("4hour", 14_400),
            "1d" | "1day" | "daily" => ("1day", 86_400),
            "1w" | "1week" | "weekly" => ("1week", 604_800),
            _ => {
                return Err(ScanError::InvalidInput(format!(
                    "unsupported bar interval: {value}"
                )))
            }
        };
        Ok(Self {
            label: label.to_string(),
            step_seconds,
        })
    }

    pub fn daily() -> Self {
        Self {
            label: "1day".to_string(),
            step_seconds: 86_400,
        }
    }
}

/// Freshness/lookback requirements, declared once per scan and applied
/// uniformly to every symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequirements {
    pub lookback_bars: usize,
    pub interval: BarInterval,
    pub require_fundamentals: bool,
}

impl DataRequirements {
    pub fn daily(lookback_bars: usize) -> Self {
        Self {
            lookback_bars,
            interval: BarInterval::daily(),
            require_fundamentals: false,
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.lookback_bars == 0 {
            return Err(ScanError::InvalidInput(
                "lookback_bars must be > 0".to_string(),
            ));
        }
        if self.interval.step_seconds <= 0 {
            return Err(ScanError::InvalidInput(
                "bar interval step must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub market_cap: Option<f64>,
    pub eps_growth: Option<f64>,
    pub revenue_growth: Option<f64>,
}

/// Normalized per-symbol time series. Bars are in ascending time order with
/// no duplicate timestamps; a thin history is marked incomplete rather than
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDataset {
    pub ticker: Ticker,
    pub bars: Vec<Bar>,
    pub fundamentals: Option<Fundamentals>,
    pub complete: bool,
}

impl SymbolDataset {
    /// Normalizes raw provider output: sorts ascending, drops duplicate
    /// timestamps (first occurrence wins), trims to the lookback window and
    /// derives the completeness flag from the requirements.
    pub fn normalized(
        ticker: Ticker,
        mut bars: Vec<Bar>,
        fundamentals: Option<Fundamentals>,
        requirements: &DataRequirements,
    ) -> Self {
        bars.sort_by_key(|bar| bar.timestamp);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            if deduped.last().map(|last: &Bar| last.timestamp) == Some(bar.timestamp) {
                continue;
            }
            deduped.push(bar);
        }
        if deduped.len() > requirements.lookback_bars {
            deduped.drain(..deduped.len() - requirements.lookback_bars);
        }
        let complete = deduped.len() >= requirements.lookback_bars
            && (!requirements.require_fundamentals || fundamentals.is_some());
        Self {
            ticker,
            bars: deduped,
            fundamentals,
            complete,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    pub fn has_volume(&self) -> bool {
        !self.bars.is_empty() && self.bars.iter().all(|bar| bar.volume.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::close_only(ts, close)
    }

    #[test]
    fn normalization_sorts_and_dedupes() {
        let requirements = DataRequirements::daily(10);
        let ticker = Ticker::parse("AAPL").unwrap();
        let dataset = SymbolDataset::normalized(
            ticker,
            vec![bar(30, 3.0), bar(10, 1.0), bar(20, 2.0), bar(20, 9.0)],
            None,
            &requirements,
        );
        let timestamps: Vec<i64> = dataset.bars.iter().map(|b| b.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
        // first occurrence of the duplicate timestamp wins
        assert_eq!(dataset.bars[1].close, 2.0);
        assert!(!dataset.complete);
    }

    #[test]
    fn normalization_trims_to_lookback_window() {
        let requirements = DataRequirements::daily(2);
        let ticker = Ticker::parse("MSFT").unwrap();
        let dataset = SymbolDataset::normalized(
            ticker,
            vec![bar(10, 1.0), bar(20, 2.0), bar(30, 3.0)],
            None,
            &requirements,
        );
        assert_eq!(dataset.bars.len(), 2);
        assert_eq!(dataset.bars[0].timestamp, 20);
        assert!(dataset.complete);
    }

    #[test]
    fn missing_fundamentals_mark_dataset_incomplete_when_required() {
        let mut requirements = DataRequirements::daily(1);
        requirements.require_fundamentals = true;
        let ticker = Ticker::parse("NVDA").unwrap();
        let dataset =
            SymbolDataset::normalized(ticker.clone(), vec![bar(10, 1.0)], None, &requirements);
        assert!(!dataset.complete);
        let dataset = SymbolDataset::normalized(
            ticker,
            vec![bar(10, 1.0)],
            Some(Fundamentals::default()),
            &requirements,
        );
        assert!(dataset.complete);
    }

    #[test]
    fn interval_parse_rejects_unknown_labels() {
        assert!(BarInterval::parse("1d").is_ok());
        assert_eq!(BarInterval::parse("daily").unwrap().step_seconds, 86_400);
        assert!(BarInterval::parse("7m").is_err());
    }
}
