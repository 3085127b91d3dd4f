use crate::errors::ScanError;
use crate::services::dataset::{DataRequirements, SymbolDataset};
use crate::value_objects::ticker::Ticker;
use std::collections::BTreeMap;

/// Market-data vendor port. The concrete integration lives in
/// infrastructure; the core only sees normalized datasets.
pub trait StockDataProvider: Send + Sync {
    fn prepare_data(
        &self,
        ticker: &Ticker,
        requirements: &DataRequirements,
    ) -> Result<SymbolDataset, ScanError>;

    /// Batch fetch. The default forwards per symbol; vendors with a bulk
    /// endpoint override it to fetch in one round trip. Each symbol carries
    /// its own result so one bad symbol never poisons the batch.
    fn prepare_data_bulk(
        &self,
        tickers: &[Ticker],
        requirements: &DataRequirements,
    ) -> BTreeMap<Ticker, Result<SymbolDataset, ScanError>> {
        tickers
            .iter()
            .map(|ticker| (ticker.clone(), self.prepare_data(ticker, requirements)))
            .collect()
    }
}
