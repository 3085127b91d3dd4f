use crate::entities::scan_result::DetectionResult;
use crate::errors::ScanError;
use crate::services::dataset::SymbolDataset;
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod cup_handle;

pub use cup_handle::{CupHandleDetector, CupHandleParams, CUP_HANDLE_ID};

/// Capability contract shared by every pattern detector variant.
///
/// `detect` is total: a dataset with fewer than `min_bars` bars yields an
/// absent result, never an error. Implementations must be pure so symbols
/// can be evaluated in parallel.
pub trait PatternDetector: std::fmt::Debug + Send + Sync {
    fn id(&self) -> &'static str;
    fn min_bars(&self) -> usize;
    fn detect(&self, dataset: &SymbolDataset) -> DetectionResult;
}

/// Maps detector identifiers to implementations. Deprecated names resolve
/// through an alias table to the same implementation instead of living on
/// as separate variants.
#[derive(Default, Clone)]
pub struct DetectorRegistry {
    detectors: BTreeMap<String, Arc<dyn PatternDetector>>,
    aliases: BTreeMap<String, String>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the reference detector and its legacy alias.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CupHandleDetector::default()));
        registry.aliases.insert(
            "cup_with_handle".to_string(),
            CUP_HANDLE_ID.to_string(),
        );
        registry
    }

    pub fn register(&mut self, detector: Arc<dyn PatternDetector>) {
        self.detectors.insert(detector.id().to_string(), detector);
    }

    pub fn register_alias(&mut self, alias: &str, target: &str) -> Result<(), ScanError> {
        if !self.detectors.contains_key(target) {
            return Err(ScanError::InvalidInput(format!(
                "alias {alias} points at unknown detector {target}"
            )));
        }
        self.aliases.insert(alias.to_string(), target.to_string());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn PatternDetector>> {
        let canonical = self.aliases.get(id).map(String::as_str).unwrap_or(id);
        self.detectors.get(canonical).cloned()
    }

    /// Resolves a list of configured detector ids, failing fast on any
    /// unknown name before a scan does real work.
    pub fn resolve_active(&self, ids: &[String]) -> Result<Vec<Arc<dyn PatternDetector>>, ScanError> {
        let mut active = Vec::with_capacity(ids.len());
        for id in ids {
            let detector = self
                .get(id)
                .ok_or_else(|| ScanError::InvalidInput(format!("unknown detector: {id}")))?;
            active.push(detector);
        }
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_resolves_to_the_same_implementation() {
        let registry = DetectorRegistry::with_defaults();
        let canonical = registry.get(CUP_HANDLE_ID).unwrap();
        let aliased = registry.get("cup_with_handle").unwrap();
        assert_eq!(canonical.id(), aliased.id());
    }

    #[test]
    fn unknown_detector_fails_resolution() {
        let registry = DetectorRegistry::with_defaults();
        let err = registry
            .resolve_active(&["head_and_shoulders".to_string()])
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn alias_registration_requires_existing_target() {
        let mut registry = DetectorRegistry::new();
        assert!(registry.register_alias("old_name", "missing").is_err());
    }
}
