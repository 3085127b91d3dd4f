use crate::errors::ScanError;
use crate::services::universe::UniverseDef;

/// Catalog lookup behind universe resolution. Implementations must be
/// read-only; an unknown index/sector is an `InvalidUniverse` error.
pub trait UniverseRepository {
    fn resolve_symbols(&self, def: &UniverseDef) -> Result<Vec<String>, ScanError>;
}
