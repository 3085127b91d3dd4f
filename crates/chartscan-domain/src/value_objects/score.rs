use serde::{Deserialize, Serialize};

/// Composite / detector score, clamped to [0, 100]. Construction never
/// fails: out-of-range and non-finite inputs clamp to the nearest bound.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);
    pub const MAX: Score = Score(100.0);

    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Score(0.0);
        }
        Score(value.clamp(0.0, 100.0))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for Score {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ok(Score::clamped(value))
    }
}
