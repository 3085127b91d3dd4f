use crate::entities::scan_result::DetectionResult;
use crate::services::dataset::SymbolDataset;
use crate::services::detectors::PatternDetector;
use crate::value_objects::bar::Bar;
use crate::value_objects::pivot::{PivotKind, PivotPoint};
use crate::value_objects::score::Score;
use serde::{Deserialize, Serialize};

pub const CUP_HANDLE_ID: &str = "cup_handle";

/// Shape thresholds for the cup-with-handle detector. All depths are
/// fractions of the left-rim price; the handle depth bound is a fraction of
/// the cup's own depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CupHandleParams {
    pub min_cup_depth: f64,
    pub max_cup_depth: f64,
    pub min_cup_bars: usize,
    pub max_cup_bars: usize,
    pub rim_tolerance: f64,
    pub min_rounding_bars: usize,
    pub min_handle_bars: usize,
    pub max_handle_bars: usize,
    pub min_handle_depth: f64,
    pub max_handle_depth_frac: f64,
    pub present_threshold: f64,
}

impl Default for CupHandleParams {
    fn default() -> Self {
        Self {
            min_cup_depth: 0.12,
            max_cup_depth: 0.50,
            min_cup_bars: 25,
            max_cup_bars: 130,
            rim_tolerance: 0.05,
            min_rounding_bars: 3,
            min_handle_bars: 2,
            max_handle_bars: 25,
            min_handle_depth: 0.005,
            max_handle_depth_frac: 0.5,
            present_threshold: 60.0,
        }
    }
}

// Component weights for candidate scoring. The volume share is
// renormalized away (with a confidence penalty) when volume is absent.
const W_SYMMETRY: f64 = 0.30;
const W_SMOOTHNESS: f64 = 0.25;
const W_HANDLE: f64 = 0.25;
const W_VOLUME: f64 = 0.20;
const NO_VOLUME_PENALTY: f64 = 0.95;

#[derive(Debug, Clone)]
struct CupCandidate {
    left_rim: usize,
    bottom: usize,
    right_rim: usize,
    handle_low: Option<usize>,
    breakout: Option<usize>,
    rim_price: f64,
    score: f64,
}

#[derive(Debug, Default)]
pub struct CupHandleDetector {
    params: CupHandleParams,
}

impl CupHandleDetector {
    pub fn new(params: CupHandleParams) -> Self {
        Self { params }
    }

    /// A left-rim candidate is a local maximum: no higher close in the two
    /// bars before, strictly higher than the two bars after.
    fn is_local_max(closes: &[f64], idx: usize) -> bool {
        if idx + 1 >= closes.len() {
            return false;
        }
        let before = &closes[idx.saturating_sub(2)..idx];
        let after = &closes[idx + 1..(idx + 3).min(closes.len())];
        before.iter().all(|&c| c <= closes[idx]) && after.iter().all(|&c| c < closes[idx])
    }

    /// Walks forward from a left rim looking for the first qualifying
    /// recovery. Tracks the running trough; gives up when the decline gets
    /// too deep to be a continuation pattern.
    fn find_cup(&self, closes: &[f64], left_rim: usize) -> Option<(usize, usize)> {
        let p = &self.params;
        let rim = closes[left_rim];
        if !(rim > 0.0) {
            return None;
        }

        let mut bottom = left_rim;
        let mut bottom_price = rim;
        let end = (left_rim + p.max_cup_bars).min(closes.len() - 1);
        for j in left_rim + 1..=end {
            let close = closes[j];
            if close < bottom_price {
                bottom = j;
                bottom_price = close;
            }
            let depth = (rim - bottom_price) / rim;
            if depth > p.max_cup_depth {
                return None;
            }
            if j - left_rim >= p.min_cup_bars
                && depth >= p.min_cup_depth
                && bottom > left_rim
                && close >= rim * (1.0 - p.rim_tolerance)
            {
                return Some((bottom, j));
            }
        }
        None
    }

    /// Rounded-bottom gate: a genuine cup dwells near its low for several
    /// bars, a V-shaped washout does not.
    fn is_rounded(&self, closes: &[f64], candidate: (usize, usize, usize)) -> bool {
        let (left_rim, bottom, right_rim) = candidate;
        let rim = closes[left_rim];
        let band = closes[bottom] + 0.25 * (rim - closes[bottom]);
        let dwell = closes[left_rim..=right_rim]
            .iter()
            .filter(|&&c| c <= band)
            .count();
        dwell >= self.params.min_rounding_bars
    }

    fn find_handle(&self, closes: &[f64], rim_price: f64, cup_depth: f64, right_rim: usize) -> Option<usize> {
        let p = &self.params;
        let end = (right_rim + p.max_handle_bars).min(closes.len() - 1);
        if right_rim >= end {
            return None;
        }
        let mut low = right_rim + 1;
        for j in right_rim + 1..=end {
            if closes[j] < closes[low] {
                low = j;
            }
        }
        let depth = (rim_price - closes[low]) / rim_price;
        let within_bounds = depth >= p.min_handle_depth
            && depth <= p.max_handle_depth_frac * cup_depth
            && low - right_rim >= p.min_handle_bars;
        within_bounds.then_some(low)
    }

    fn find_breakout(closes: &[f64], rim_price: f64, from: usize) -> Option<usize> {
        (from + 1..closes.len()).find(|&j| closes[j] > rim_price)
    }

    fn score_candidate(&self, bars: &[Bar], candidate: &CupCandidate, has_volume: bool) -> f64 {
        let p = &self.params;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (left_rim, bottom, right_rim) = (candidate.left_rim, candidate.bottom, candidate.right_rim);
        let rim = candidate.rim_price;
        let depth = (rim - closes[bottom]) / rim;
        let band = closes[bottom] + 0.25 * (rim - closes[bottom]);

        // Symmetry of the two cup legs.
        let left_len = (bottom - left_rim) as f64;
        let right_len = (right_rim - bottom) as f64;
        let symmetry = 1.0 - (left_len - right_len).abs() / (left_len + right_len);

        // Smoothness: dwell time near the low plus low bottom volatility
        // relative to the decline/advance legs.
        let cup_len = (right_rim - left_rim + 1) as f64;
        let dwell = closes[left_rim..=right_rim]
            .iter()
            .filter(|&&c| c <= band)
            .count() as f64;
        let dwell_component = (dwell / cup_len / 0.3).clamp(0.0, 1.0);
        let mut bottom_moves = (0.0, 0usize);
        let mut leg_moves = (0.0, 0usize);
        for j in left_rim + 1..=right_rim {
            let step = (closes[j] - closes[j - 1]).abs();
            if closes[j] <= band {
                bottom_moves = (bottom_moves.0 + step, bottom_moves.1 + 1);
            } else {
                leg_moves = (leg_moves.0 + step, leg_moves.1 + 1);
            }
        }
        let bottom_vol = if bottom_moves.1 > 0 {
            bottom_moves.0 / bottom_moves.1 as f64
        } else {
            0.0
        };
        let leg_vol = if leg_moves.1 > 0 {
            leg_moves.0 / leg_moves.1 as f64
        } else {
            0.0
        };
        let vol_ratio = if leg_vol > 0.0 {
            (bottom_vol / leg_vol).min(1.0)
        } else {
            1.0
        };
        let smoothness = 0.5 * dwell_component + 0.5 * (1.0 - vol_ratio);

        // Shallower handles relative to the cup score higher.
        let handle_component = match candidate.handle_low {
            Some(low) => {
                let handle_depth = (rim - closes[low]) / rim;
                let max_depth = p.max_handle_depth_frac * depth;
                if max_depth > 0.0 {
                    (1.0 - handle_depth / max_depth).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        let base = W_SYMMETRY * symmetry + W_SMOOTHNESS * smoothness + W_HANDLE * handle_component;

        if !has_volume {
            return 100.0 * (base / (1.0 - W_VOLUME)) * NO_VOLUME_PENALTY;
        }

        // Volume profile: contraction into the handle, expansion on the
        // breakout bar.
        let volume_at = |j: usize| bars[j].volume.unwrap_or(0.0);
        let cup_volume: f64 = (left_rim..=right_rim).map(volume_at).sum::<f64>() / cup_len;
        let contraction = match candidate.handle_low {
            Some(low) if cup_volume > 0.0 => {
                let handle_len = (low - right_rim) as f64;
                let handle_volume: f64 =
                    (right_rim + 1..=low).map(volume_at).sum::<f64>() / handle_len;
                ((cup_volume - handle_volume) / (0.5 * cup_volume)).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };
        let expansion = match candidate.breakout {
            Some(b) if cup_volume > 0.0 => (volume_at(b) / (1.3 * cup_volume)).clamp(0.0, 1.0),
            Some(_) => 0.0,
            // Not broken out yet: neutral, the pattern may still be forming.
            None => 0.5,
        };
        let volume_component = 0.5 * contraction + 0.5 * expansion;

        100.0 * (base + W_VOLUME * volume_component)
    }
}

/// Higher score wins; exact ties go to the most recently completed cup.
fn better_of(a: CupCandidate, b: CupCandidate) -> CupCandidate {
    if b.score > a.score || (b.score == a.score && b.right_rim > a.right_rim) {
        b
    } else {
        a
    }
}

impl PatternDetector for CupHandleDetector {
    fn id(&self) -> &'static str {
        CUP_HANDLE_ID
    }

    fn min_bars(&self) -> usize {
        self.params.min_cup_bars + self.params.min_handle_bars + 2
    }

    fn detect(&self, dataset: &SymbolDataset) -> DetectionResult {
        let bars = &dataset.bars;
        if bars.len() < self.min_bars() {
            return DetectionResult::absent(CUP_HANDLE_ID);
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let has_volume = dataset.has_volume();

        let mut best: Option<CupCandidate> = None;
        for left_rim in 0..closes.len() {
            if !Self::is_local_max(&closes, left_rim) {
                continue;
            }
            let Some((bottom, right_rim)) = self.find_cup(&closes, left_rim) else {
                continue;
            };
            if !self.is_rounded(&closes, (left_rim, bottom, right_rim)) {
                continue;
            }
            let rim_price = closes[left_rim];
            let cup_depth = (rim_price - closes[bottom]) / rim_price;
            let handle_low = self.find_handle(&closes, rim_price, cup_depth, right_rim);
            let breakout = Self::find_breakout(&closes, rim_price, handle_low.unwrap_or(right_rim));
            let mut candidate = CupCandidate {
                left_rim,
                bottom,
                right_rim,
                handle_low,
                breakout,
                rim_price,
                score: 0.0,
            };
            candidate.score = self.score_candidate(bars, &candidate, has_volume);
            best = Some(match best.take() {
                Some(current) => better_of(current, candidate),
                None => candidate,
            });
        }

        let Some(best) = best else {
            return DetectionResult::absent(CUP_HANDLE_ID);
        };

        let pivot = |kind, idx: usize| PivotPoint::new(kind, bars[idx].timestamp, closes[idx]);
        let mut pivots = vec![
            pivot(PivotKind::LeftRim, best.left_rim),
            pivot(PivotKind::CupBottom, best.bottom),
            pivot(PivotKind::RightRim, best.right_rim),
        ];
        if let Some(low) = best.handle_low {
            pivots.push(pivot(PivotKind::HandleLow, low));
        }
        if let Some(b) = best.breakout {
            pivots.push(pivot(PivotKind::Breakout, b));
        }

        let score = Score::clamped(best.score);
        DetectionResult {
            detector_id: CUP_HANDLE_ID.to_string(),
            score,
            present: best.handle_low.is_some() && score.get() >= self.params.present_threshold,
            pivots,
            breakout_level: Some(best.rim_price),
        }
    }
}
