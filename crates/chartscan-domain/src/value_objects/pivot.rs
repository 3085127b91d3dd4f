use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotKind {
    LeftRim,
    CupBottom,
    RightRim,
    HandleLow,
    Breakout,
}

/// A key price/time point supporting a detection, kept so downstream
/// consumers can inspect the shape (including near-misses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    pub kind: PivotKind,
    pub timestamp: i64,
    pub price: f64,
}

impl PivotPoint {
    pub fn new(kind: PivotKind, timestamp: i64, price: f64) -> Self {
        Self {
            kind,
            timestamp,
            price,
        }
    }
}
