use chartscan_domain::errors::ScanError;
use chartscan_domain::repositories::universe::UniverseRepository;
use chartscan_domain::services::universe::UniverseDef;
use std::collections::BTreeMap;

/// Membership catalog loaded once at startup. Index and sector names are
/// matched case-insensitively; explicit lists pass through untouched.
#[derive(Default)]
pub struct StaticUniverseCatalog {
    indexes: BTreeMap<String, Vec<String>>,
    sectors: BTreeMap<String, Vec<String>>,
}

impl StaticUniverseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, name: &str, symbols: &[&str]) -> Self {
        self.indexes.insert(
            name.to_lowercase(),
            symbols.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_sector(mut self, name: &str, symbols: &[&str]) -> Self {
        self.sectors.insert(
            name.to_lowercase(),
            symbols.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

impl UniverseRepository for StaticUniverseCatalog {
    fn resolve_symbols(&self, def: &UniverseDef) -> Result<Vec<String>, ScanError> {
        match def {
            UniverseDef::Index { name } => self
                .indexes
                .get(&name.to_lowercase())
                .cloned()
                .ok_or_else(|| ScanError::InvalidUniverse(format!("unknown index: {name}"))),
            UniverseDef::Sector { name } => self
                .sectors
                .get(&name.to_lowercase())
                .cloned()
                .ok_or_else(|| ScanError::InvalidUniverse(format!("unknown sector: {name}"))),
            UniverseDef::Explicit { symbols } => Ok(symbols.clone()),
        }
    }
}
