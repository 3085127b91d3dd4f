use crate::services::dataset::SymbolDataset;
use crate::services::scoring::AuxiliarySignal;
use crate::value_objects::score::Score;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalConfig {
    pub trend_window: usize,
    pub trend_weight: f64,
    pub volume_window: usize,
    pub volume_weight: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            trend_window: 50,
            trend_weight: 1.0,
            volume_window: 50,
            volume_weight: 1.0,
        }
    }
}

fn sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let slice = &values[values.len() - window..];
    Some(slice.iter().sum::<f64>() / window as f64)
}

/// Trend strength: last close versus its long SMA, mapped so that 10%
/// below the average is 0 and 10% above is 100.
pub fn trend_strength(dataset: &SymbolDataset, config: &SignalConfig) -> Option<AuxiliarySignal> {
    let closes = dataset.closes();
    let average = sma(&closes, config.trend_window)?;
    let last = *closes.last()?;
    if !(average > 0.0) {
        return None;
    }
    let ratio = last / average;
    let value = (ratio - 0.9) / 0.2 * 100.0;
    Some(AuxiliarySignal {
        name: "trend_strength".to_string(),
        value: Score::clamped(value),
        weight: config.trend_weight,
    })
}

/// Relative volume: the recent 5-bar average versus the trailing window,
/// mapped so that half the usual volume is 0 and double is 100. Omitted
/// (not fabricated) when the dataset carries no volume.
pub fn relative_volume(dataset: &SymbolDataset, config: &SignalConfig) -> Option<AuxiliarySignal> {
    if !dataset.has_volume() {
        return None;
    }
    let volumes: Vec<f64> = dataset
        .bars
        .iter()
        .map(|bar| bar.volume.unwrap_or(0.0))
        .collect();
    let trailing = sma(&volumes, config.volume_window)?;
    let recent = sma(&volumes, 5.min(volumes.len()))?;
    if !(trailing > 0.0) {
        return None;
    }
    let ratio = recent / trailing;
    let value = (ratio - 0.5) / 1.5 * 100.0;
    Some(AuxiliarySignal {
        name: "relative_volume".to_string(),
        value: Score::clamped(value),
        weight: config.volume_weight,
    })
}

/// All auxiliary signals computable for one dataset. Signals that cannot be
/// computed (thin history, no volume) are simply absent.
pub fn auxiliary_signals(dataset: &SymbolDataset, config: &SignalConfig) -> Vec<AuxiliarySignal> {
    let mut signals = Vec::new();
    if config.trend_weight > 0.0 {
        signals.extend(trend_strength(dataset, config));
    }
    if config.volume_weight > 0.0 {
        signals.extend(relative_volume(dataset, config));
    }
    signals
}
