use chartscan_domain::errors::ScanError;
use chartscan_domain::repositories::market_data::StockDataProvider;
use chartscan_domain::services::dataset::{DataRequirements, Fundamentals, SymbolDataset};
use chartscan_domain::value_objects::bar::Bar;
use chartscan_domain::value_objects::ticker::Ticker;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// File-backed market data: one `{TICKER}.csv` per symbol under a root
/// directory, columns `timestamp_utc,open,high,low,close,volume`. Rows may
/// arrive unsorted or duplicated; normalization handles both.
pub struct CsvBarProvider {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    timestamp_utc: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
}

impl CsvBarProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn symbol_path(&self, ticker: &Ticker) -> PathBuf {
        self.root.join(format!("{}.csv", ticker.as_str()))
    }

    fn load_bars(&self, path: &Path) -> Result<Vec<Bar>, ScanError> {
        let file = File::open(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ScanError::not_found("bar file", path.display().to_string())
            } else {
                ScanError::Infrastructure(format!(
                    "failed to open bar csv {}: {}",
                    path.display(),
                    err
                ))
            }
        })?;
        let mut reader = csv::Reader::from_reader(file);
        let mut bars = Vec::new();
        for result in reader.deserialize::<BarRecord>() {
            let record = result.map_err(|err| {
                ScanError::Infrastructure(format!(
                    "failed to parse bar row in {}: {}",
                    path.display(),
                    err
                ))
            })?;
            if !record.close.is_finite() || record.close <= 0.0 {
                return Err(ScanError::Infrastructure(format!(
                    "invalid close in {}: {}",
                    path.display(),
                    record.close
                )));
            }
            bars.push(Bar {
                timestamp: parse_timestamp(&record.timestamp_utc)?,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }
        Ok(bars)
    }
}

impl StockDataProvider for CsvBarProvider {
    fn prepare_data(
        &self,
        ticker: &Ticker,
        requirements: &DataRequirements,
    ) -> Result<SymbolDataset, ScanError> {
        let path = self.symbol_path(ticker);
        let bars = self.load_bars(&path)?;
        tracing::debug!(ticker = ticker.as_str(), bars = bars.len(), "loaded bar csv");
        // fundamentals are not carried in bar files
        let fundamentals: Option<Fundamentals> = None;
        Ok(SymbolDataset::normalized(
            ticker.clone(),
            bars,
            fundamentals,
            requirements,
        ))
    }
}

fn parse_timestamp(value: &str) -> Result<i64, ScanError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            ScanError::Infrastructure(format!("invalid date: {value}"))
        })?;
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }
    Err(ScanError::Infrastructure(format!(
        "unsupported timestamp format: {value}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    #[test]
    fn loads_and_normalizes_a_symbol_file() {
        let root = Path::new("/tmp/chartscan_csv_bars_load");
        fs::create_dir_all(root).expect("create dir");
        let csv_data = "timestamp_utc,open,high,low,close,volume\n\
2026-01-03,10,11,9,10.5,1000\n\
2026-01-01,9,10,8,9.5,900\n\
2026-01-02,9.5,10.5,9,10.0,950\n\
2026-01-02,0,0,0,1.0,1\n";
        fs::write(root.join("AAPL.csv"), csv_data).expect("write csv");

        let provider = CsvBarProvider::new(root);
        let requirements = DataRequirements::daily(10);
        let ticker = Ticker::parse("AAPL").unwrap();
        let dataset = provider.prepare_data(&ticker, &requirements).expect("load");

        // sorted ascending, duplicate timestamp dropped (first wins)
        assert_eq!(dataset.bars.len(), 3);
        assert!(dataset.bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(dataset.bars[1].close, 10.0);
        assert!(dataset.has_volume());
        assert!(!dataset.complete);
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let provider = CsvBarProvider::new("/tmp/chartscan_csv_bars_missing");
        let requirements = DataRequirements::daily(10);
        let ticker = Ticker::parse("ZZZZ").unwrap();
        let err = provider.prepare_data(&ticker, &requirements).unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn malformed_rows_are_reported_not_swallowed() {
        let root = Path::new("/tmp/chartscan_csv_bars_malformed");
        fs::create_dir_all(root).expect("create dir");
        let csv_data = "timestamp_utc,open,high,low,close,volume\n\
not-a-date,1,1,1,1,1\n";
        fs::write(root.join("MSFT.csv"), csv_data).expect("write csv");

        let provider = CsvBarProvider::new(root);
        let requirements = DataRequirements::daily(10);
        let ticker = Ticker::parse("MSFT").unwrap();
        let err = provider.prepare_data(&ticker, &requirements).unwrap_err();
        assert!(matches!(err, ScanError::Infrastructure(_)));
    }

    #[test]
    fn timestamp_formats_accepted() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:00Z").unwrap(), 0);
        assert_eq!(parse_timestamp("1970-01-01 00:00:00").unwrap(), 0);
        assert_eq!(parse_timestamp("1970-01-02").unwrap(), 86_400);
        assert!(parse_timestamp("01/02/1970").is_err());
    }
}
