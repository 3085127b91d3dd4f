use crate::entities::scan_result::DetectionResult;
use crate::value_objects::score::Score;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An auxiliary technical/fundamental input to the composite score, already
/// normalized to [0, 100] with its own blend weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliarySignal {
    pub name: String,
    pub value: Score,
    pub weight: f64,
}

/// Blends detector confidences and auxiliary signals into one 0-100 rating.
///
/// Deterministic and pure: inputs are iterated in a stable order, there is
/// no clock and no randomness, and identical inputs always produce
/// bit-identical output.
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    detector_weights: BTreeMap<String, f64>,
}

impl CompositeScorer {
    /// Equal weight across whatever detectors are active.
    pub fn equal_weight() -> Self {
        Self::default()
    }

    pub fn with_weights(detector_weights: BTreeMap<String, f64>) -> Self {
        Self { detector_weights }
    }

    fn detector_weight(&self, detector_id: &str) -> f64 {
        self.detector_weights
            .get(detector_id)
            .copied()
            .unwrap_or(1.0)
            .max(0.0)
    }

    pub fn score(&self, detections: &[DetectionResult], signals: &[AuxiliarySignal]) -> Score {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        let mut ordered: Vec<&DetectionResult> = detections.iter().collect();
        ordered.sort_by(|a, b| a.detector_id.cmp(&b.detector_id));
        for detection in ordered {
            let weight = self.detector_weight(&detection.detector_id);
            weighted += weight * detection.score.get();
            total_weight += weight;
        }
        for signal in signals {
            let weight = signal.weight.max(0.0);
            weighted += weight * signal.value.get();
            total_weight += weight;
        }

        if total_weight == 0.0 {
            return Score::ZERO;
        }
        Score::clamped(weighted / total_weight)
    }
}
