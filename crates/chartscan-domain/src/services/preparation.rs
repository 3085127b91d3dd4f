use crate::entities::scan::SkippedSymbol;
use crate::errors::ScanError;
use crate::repositories::market_data::StockDataProvider;
use crate::services::dataset::{DataRequirements, SymbolDataset};
use crate::value_objects::ticker::Ticker;
use serde::{Deserialize, Serialize};

/// What the scan does when a symbol's data cannot be prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    SkipAndContinue,
    Abort,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::SkipAndContinue
    }
}

/// Bulk preparation output: datasets in input order plus the symbols that
/// could not be prepared. One symbol's failure never discards the batch.
#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    pub datasets: Vec<SymbolDataset>,
    pub failures: Vec<SkippedSymbol>,
}

/// Prepares the batch through the provider's bulk entry point (which may
/// be a real bulk fetch or the per-symbol default), isolating per-symbol
/// failures. Under `Abort` any failure escalates to a `PartialData` error;
/// under the default policy failures are returned for the caller's summary.
pub fn prepare_bulk(
    provider: &dyn StockDataProvider,
    tickers: &[Ticker],
    requirements: &DataRequirements,
    policy: FailurePolicy,
) -> Result<PreparedBatch, ScanError> {
    let mut results = provider.prepare_data_bulk(tickers, requirements);
    let mut batch = PreparedBatch::default();
    for ticker in tickers {
        let outcome = results
            .remove(ticker)
            .unwrap_or_else(|| Err(ScanError::not_found("bar series", ticker.as_str())));
        match outcome {
            Ok(dataset) => batch.datasets.push(dataset),
            Err(err) => {
                if policy == FailurePolicy::Abort {
                    return Err(ScanError::PartialData(format!(
                        "data preparation failed for {ticker}: {err}"
                    )));
                }
                batch.failures.push(SkippedSymbol {
                    ticker: ticker.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(batch)
}
