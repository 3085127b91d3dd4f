use crate::errors::ScanError;
use crate::repositories::universe::UniverseRepository;
use crate::value_objects::ticker::Ticker;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Abstract definition of the set of symbols eligible for a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UniverseDef {
    Index { name: String },
    Sector { name: String },
    Explicit { symbols: Vec<String> },
}

impl UniverseDef {
    pub fn describe(&self) -> String {
        match self {
            UniverseDef::Index { name } => format!("index:{name}"),
            UniverseDef::Sector { name } => format!("sector:{name}"),
            UniverseDef::Explicit { symbols } => format!("explicit[{}]", symbols.len()),
        }
    }
}

/// Expands a universe definition into a concrete ordered set of tickers.
///
/// De-duplicates while preserving first-seen order so resolved universes
/// are reproducible. Read-only against the catalog behind the repository.
pub fn resolve(
    repo: &dyn UniverseRepository,
    def: &UniverseDef,
    require_non_empty: bool,
) -> Result<Vec<Ticker>, ScanError> {
    let raw = repo.resolve_symbols(def)?;

    let mut seen: HashSet<Ticker> = HashSet::with_capacity(raw.len());
    let mut resolved: Vec<Ticker> = Vec::with_capacity(raw.len());
    for symbol in &raw {
        let ticker = Ticker::parse(symbol)
            .map_err(|err| ScanError::InvalidUniverse(format!("bad symbol {symbol:?}: {err}")))?;
        if seen.insert(ticker.clone()) {
            resolved.push(ticker);
        }
    }

    if require_non_empty && resolved.is_empty() {
        return Err(ScanError::InvalidUniverse(format!(
            "universe {} resolved to an empty set",
            def.describe()
        )));
    }
    Ok(resolved)
}
