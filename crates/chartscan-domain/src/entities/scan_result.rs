use crate::entities::scan::ScanId;
use crate::value_objects::pivot::PivotPoint;
use crate::value_objects::score::Score;
use crate::value_objects::ticker::Ticker;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one detector on one symbol's dataset. Immutable once
/// produced; the breakout level is recorded even when `present` is false so
/// near-misses stay inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detector_id: String,
    pub score: Score,
    pub present: bool,
    pub pivots: Vec<PivotPoint>,
    pub breakout_level: Option<f64>,
}

impl DetectionResult {
    /// The "no signal" result. Absence of a pattern is not an error.
    pub fn absent(detector_id: &str) -> Self {
        Self {
            detector_id: detector_id.to_string(),
            score: Score::ZERO,
            present: false,
            pivots: Vec::new(),
            breakout_level: None,
        }
    }
}

/// One persisted row per (scan, symbol). Created once, never mutated,
/// bulk-inserted inside the scan's unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResultRow {
    pub scan_id: ScanId,
    pub ticker: Ticker,
    pub overall: Score,
    pub detector_scores: BTreeMap<String, Score>,
    pub patterns_present: Vec<String>,
    pub evidence: serde_json::Value,
}

impl ScanResultRow {
    pub fn from_detections(
        scan_id: ScanId,
        ticker: Ticker,
        overall: Score,
        detections: &[DetectionResult],
    ) -> Self {
        let mut detector_scores = BTreeMap::new();
        let mut patterns_present = Vec::new();
        let mut evidence = serde_json::Map::new();
        for detection in detections {
            detector_scores.insert(detection.detector_id.clone(), detection.score);
            if detection.present {
                patterns_present.push(detection.detector_id.clone());
            }
            evidence.insert(
                detection.detector_id.clone(),
                serde_json::json!({
                    "breakout_level": detection.breakout_level,
                    "pivots": detection.pivots,
                }),
            );
        }
        patterns_present.sort();
        Self {
            scan_id,
            ticker,
            overall,
            detector_scores,
            patterns_present,
            evidence: serde_json::Value::Object(evidence),
        }
    }
}
