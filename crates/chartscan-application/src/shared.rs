use crate::config::ScanConfig;
use chartscan_domain::entities::scan::{Scan, ScanId};
use chartscan_domain::errors::ScanError;
use chartscan_domain::repositories::scan::ScanRepository;
use chartscan_domain::services::detectors::{CupHandleDetector, DetectorRegistry};
use chartscan_domain::services::scoring::CompositeScorer;
use chartscan_domain::services::signals::SignalConfig;
use std::sync::Arc;

/// Shared lookup used by every use case that references an existing scan.
/// Returns the scan together with the feature-run pointer it carries.
pub fn resolve_scan(
    scans: &dyn ScanRepository,
    scan_id: &ScanId,
) -> Result<(Scan, Option<String>), ScanError> {
    let scan = scans
        .get_by_scan_id(scan_id)?
        .ok_or_else(|| ScanError::not_found("scan", scan_id.as_str()))?;
    let feature_run_id = scan.feature_run_id.clone();
    Ok((scan, feature_run_id))
}

/// Builds the detector registry for a scan, applying any per-detector
/// parameter overrides from config. The deprecated `cup_with_handle` name
/// stays routed to the reference implementation.
pub fn build_registry(config: &ScanConfig) -> DetectorRegistry {
    let mut registry = DetectorRegistry::with_defaults();
    if let Some(params) = config
        .detectors
        .as_ref()
        .and_then(|d| d.cup_handle.clone())
    {
        registry.register(Arc::new(CupHandleDetector::new(params)));
    }
    registry
}

pub fn build_scorer(config: &ScanConfig) -> CompositeScorer {
    match config.detectors.as_ref().and_then(|d| d.weights.clone()) {
        Some(weights) => CompositeScorer::with_weights(weights),
        None => CompositeScorer::equal_weight(),
    }
}

pub fn build_signal_config(config: &ScanConfig) -> SignalConfig {
    config.signals.clone().unwrap_or_default()
}
