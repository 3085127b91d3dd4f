use chartscan_domain::entities::scan_result::DetectionResult;
use chartscan_domain::errors::ScanError;
use chartscan_domain::repositories::universe::UniverseRepository;
use chartscan_domain::services::dataset::{DataRequirements, SymbolDataset};
use chartscan_domain::services::detectors::{CupHandleDetector, PatternDetector};
use chartscan_domain::services::scoring::{AuxiliarySignal, CompositeScorer};
use chartscan_domain::services::universe::{self, UniverseDef};
use chartscan_domain::value_objects::bar::Bar;
use chartscan_domain::value_objects::score::Score;
use chartscan_domain::value_objects::ticker::Ticker;
use proptest::prelude::*;

fn dataset(closes: Vec<f64>, with_volume: bool) -> SymbolDataset {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: i as i64 * 86_400,
            open: close,
            high: close,
            low: close,
            close,
            volume: with_volume.then(|| 1_000.0 + (i % 7) as f64 * 100.0),
        })
        .collect();
    SymbolDataset {
        ticker: Ticker::parse("PROP").unwrap(),
        bars,
        fundamentals: None,
        complete: true,
    }
}

struct ListRepo(Vec<String>);

impl UniverseRepository for ListRepo {
    fn resolve_symbols(&self, _def: &UniverseDef) -> Result<Vec<String>, ScanError> {
        Ok(self.0.clone())
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn detector_is_total_and_bounded(
        closes in prop::collection::vec(0.01f64..10_000.0, 0..300),
        with_volume in any::<bool>(),
    ) {
        let result = CupHandleDetector::default().detect(&dataset(closes, with_volume));
        prop_assert!((0.0..=100.0).contains(&result.score.get()));
        if result.present {
            prop_assert!(result.breakout_level.is_some());
        }
    }

    #[test]
    fn composite_score_stays_in_range_and_is_deterministic(
        detector_scores in prop::collection::vec(0.0f64..=100.0, 0..6),
        signal_values in prop::collection::vec((0.0f64..=100.0, 0.0f64..=5.0), 0..4),
    ) {
        let detections: Vec<DetectionResult> = detector_scores
            .iter()
            .enumerate()
            .map(|(i, &score)| DetectionResult {
                detector_id: format!("detector_{i}"),
                score: Score::clamped(score),
                present: score >= 60.0,
                pivots: Vec::new(),
                breakout_level: None,
            })
            .collect();
        let signals: Vec<AuxiliarySignal> = signal_values
            .iter()
            .enumerate()
            .map(|(i, &(value, weight))| AuxiliarySignal {
                name: format!("signal_{i}"),
                value: Score::clamped(value),
                weight,
            })
            .collect();

        let scorer = CompositeScorer::equal_weight();
        let first = scorer.score(&detections, &signals);
        let second = scorer.score(&detections, &signals);
        prop_assert!((0.0..=100.0).contains(&first.get()));
        prop_assert_eq!(first.get().to_bits(), second.get().to_bits());
    }

    #[test]
    fn universe_resolution_is_idempotent_and_duplicate_free(
        symbols in prop::collection::vec("[A-Z]{1,5}", 0..40),
    ) {
        let repo = ListRepo(symbols);
        let def = UniverseDef::Explicit { symbols: vec![] };
        let first = universe::resolve(&repo, &def, false).unwrap();
        let second = universe::resolve(&repo, &def, false).unwrap();
        prop_assert_eq!(&first, &second);
        let mut unique = first.clone();
        unique.dedup();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), first.len());
    }

    #[test]
    fn normalization_always_yields_strictly_ascending_bars(
        timestamps in prop::collection::vec(0i64..1_000, 0..120),
    ) {
        let bars: Vec<Bar> = timestamps
            .iter()
            .map(|&ts| Bar::close_only(ts, 10.0))
            .collect();
        let requirements = DataRequirements::daily(200);
        let ticker = Ticker::parse("PROP").unwrap();
        let normalized = SymbolDataset::normalized(ticker, bars, None, &requirements);
        prop_assert!(normalized
            .bars
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp));
    }
}
