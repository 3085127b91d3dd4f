use chartscan_domain::errors::ScanError;
use chartscan_domain::services::dataset::{BarInterval, DataRequirements};
use chartscan_domain::services::detectors::CupHandleParams;
use chartscan_domain::services::preparation::FailurePolicy;
use chartscan_domain::services::signals::SignalConfig;
use chartscan_domain::services::universe::UniverseDef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    pub scan: RunConfig,
    pub universe: UniverseConfig,
    pub data: DataConfig,
    pub detectors: Option<DetectorsConfig>,
    pub signals: Option<SignalConfig>,
    pub execution: Option<ExecutionConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub scan_id: String,
    pub feature_run_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UniverseConfig {
    pub kind: String,
    pub name: Option<String>,
    pub symbols: Option<Vec<String>>,
    pub allow_empty: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub lookback_bars: usize,
    pub interval: String,
    pub require_fundamentals: Option<bool>,
    pub on_failure: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DetectorsConfig {
    pub active: Vec<String>,
    pub weights: Option<BTreeMap<String, f64>>,
    pub cup_handle: Option<CupHandleParams>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    pub concurrency: Option<usize>,
}

impl ScanConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ScanError> {
        toml::from_str(raw).map_err(|err| ScanError::InvalidInput(format!("bad scan config: {err}")))
    }

    pub fn universe_def(&self) -> Result<UniverseDef, ScanError> {
        match self.universe.kind.as_str() {
            "index" => self
                .universe
                .name
                .clone()
                .map(|name| UniverseDef::Index { name })
                .ok_or_else(|| {
                    ScanError::InvalidUniverse("index universe requires a name".to_string())
                }),
            "sector" => self
                .universe
                .name
                .clone()
                .map(|name| UniverseDef::Sector { name })
                .ok_or_else(|| {
                    ScanError::InvalidUniverse("sector universe requires a name".to_string())
                }),
            "explicit" => self
                .universe
                .symbols
                .clone()
                .map(|symbols| UniverseDef::Explicit { symbols })
                .ok_or_else(|| {
                    ScanError::InvalidUniverse("explicit universe requires symbols".to_string())
                }),
            other => Err(ScanError::InvalidUniverse(format!(
                "unknown universe kind: {other}"
            ))),
        }
    }

    pub fn requirements(&self) -> Result<DataRequirements, ScanError> {
        let requirements = DataRequirements {
            lookback_bars: self.data.lookback_bars,
            interval: BarInterval::parse(&self.data.interval)?,
            require_fundamentals: self.data.require_fundamentals.unwrap_or(false),
        };
        requirements.validate()?;
        Ok(requirements)
    }

    pub fn failure_policy(&self) -> Result<FailurePolicy, ScanError> {
        match self.data.on_failure.as_deref() {
            None | Some("skip") => Ok(FailurePolicy::SkipAndContinue),
            Some("abort") => Ok(FailurePolicy::Abort),
            Some(other) => Err(ScanError::InvalidInput(format!(
                "unknown on_failure policy: {other}"
            ))),
        }
    }

    pub fn active_detectors(&self) -> Vec<String> {
        self.detectors
            .as_ref()
            .map(|d| d.active.clone())
            .unwrap_or_else(|| vec!["cup_handle".to_string()])
    }

    pub fn concurrency(&self) -> usize {
        self.execution
            .as_ref()
            .and_then(|e| e.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[scan]
scan_id = "scan-2026-08-29"

[universe]
kind = "explicit"
symbols = ["AAPL", "MSFT"]

[data]
lookback_bars = 252
interval = "1d"
"#;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config = ScanConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.scan.scan_id, "scan-2026-08-29");
        assert_eq!(config.concurrency(), DEFAULT_CONCURRENCY);
        assert_eq!(
            config.failure_policy().unwrap(),
            FailurePolicy::SkipAndContinue
        );
        assert_eq!(config.active_detectors(), vec!["cup_handle".to_string()]);
        let requirements = config.requirements().unwrap();
        assert_eq!(requirements.lookback_bars, 252);
        assert_eq!(requirements.interval.step_seconds, 86_400);
    }

    #[test]
    fn unknown_universe_kind_is_rejected() {
        let mut config = ScanConfig::from_toml_str(MINIMAL).unwrap();
        config.universe.kind = "watchlist".to_string();
        assert!(matches!(
            config.universe_def(),
            Err(ScanError::InvalidUniverse(_))
        ));
    }

    #[test]
    fn index_universe_requires_a_name() {
        let mut config = ScanConfig::from_toml_str(MINIMAL).unwrap();
        config.universe.kind = "index".to_string();
        config.universe.name = None;
        assert!(config.universe_def().is_err());
        config.universe.name = Some("sp500".to_string());
        assert_eq!(
            config.universe_def().unwrap(),
            UniverseDef::Index {
                name: "sp500".to_string()
            }
        );
    }

    #[test]
    fn bad_policy_and_unknown_fields_fail_fast() {
        let mut config = ScanConfig::from_toml_str(MINIMAL).unwrap();
        config.data.on_failure = Some("retry".to_string());
        assert!(config.failure_policy().is_err());
        assert!(ScanConfig::from_toml_str("[scan]\nscan_id = \"x\"\nbogus = 1").is_err());
    }

    #[test]
    fn detector_params_override_from_config() {
        let raw = format!(
            "{MINIMAL}\n[detectors]\nactive = [\"cup_handle\"]\n\n[detectors.cup_handle]\nmin_cup_depth = 0.15\n"
        );
        let config = ScanConfig::from_toml_str(&raw).unwrap();
        let params = config.detectors.unwrap().cup_handle.unwrap();
        assert_eq!(params.min_cup_depth, 0.15);
        // unset fields keep their defaults
        assert_eq!(params.max_cup_bars, CupHandleParams::default().max_cup_bars);
    }
}
