/// Error taxonomy for the scan pipeline.
///
/// Per-symbol data or detection problems are not errors at all; they are
/// recorded as `SkippedSymbol` entries in the scan summary. Everything here
/// either rejects work before it starts or aborts the whole scan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid universe: {0}")]
    InvalidUniverse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("partial data failure: {0}")]
    PartialData(String),

    #[error("infrastructure failure: {0}")]
    Infrastructure(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ScanError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
