use crate::errors::ScanError;
use crate::services::dataset::DataRequirements;
use crate::services::universe::UniverseDef;
use crate::value_objects::ticker::Ticker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScanId(String);

impl ScanId {
    pub fn new(value: &str) -> Result<Self, ScanError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ScanError::InvalidInput("empty scan id".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ScanId {
    type Error = ScanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ScanId::new(&value)
    }
}

impl From<ScanId> for String {
    fn from(id: ScanId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    /// Legal transitions are pending -> running -> {completed, failed}.
    /// Terminal states never regress.
    fn allows(self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (ScanStatus::Pending, ScanStatus::Running)
                | (ScanStatus::Running, ScanStatus::Completed)
                | (ScanStatus::Running, ScanStatus::Failed)
        )
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A symbol the scan resolved but could not score, with the reason. These
/// are data, not errors: they feed the completion summary so that
/// resolved == scored + skipped always reconciles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub ticker: Ticker,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub resolved: usize,
    pub scored: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub skipped_symbols: Vec<SkippedSymbol>,
}

/// Scan lifecycle record. Exclusively owned by the orchestrator while a
/// scan runs; handed to `ScanRepository` for durability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub scan_id: ScanId,
    pub universe: UniverseDef,
    pub requirements: DataRequirements,
    pub status: ScanStatus,
    pub feature_run_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub summary: Option<ScanSummary>,
}

impl Scan {
    pub fn new(
        scan_id: ScanId,
        universe: UniverseDef,
        requirements: DataRequirements,
        feature_run_id: Option<String>,
    ) -> Self {
        Self {
            scan_id,
            universe,
            requirements,
            status: ScanStatus::Pending,
            feature_run_id,
            created_at: Utc::now(),
            completed_at: None,
            summary: None,
        }
    }

    pub fn transition(&mut self, next: ScanStatus) -> Result<(), ScanError> {
        if !self.status.allows(next) {
            return Err(ScanError::InvalidInput(format!(
                "illegal scan status transition: {} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        if matches!(next, ScanStatus::Completed | ScanStatus::Failed) {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}
