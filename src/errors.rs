use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // Fatal: the run stops before any stage executes
    #[error("Could not establish a valid perimeter: {reason}")]
    InvalidGeometry { reason: String },

    // Reported to interactive callers only, the engine substitutes defaults
    #[error("Invalid value {value:?} for parameter `{name}`: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }
}

/// Result type alias for all fallible engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Recoverable anomalies. These are recorded in the plan diagnostics and never returned as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// A geometry operation produced nothing usable and the stage fell back
    DegenerateOperationResult { operation: String },
    /// No road line survived clipping
    InsufficientRoadNetwork,
    /// No block reached the minimum block area
    InsufficientBlocks,
    /// Candidate lots dropped for area or frontage
    LotRejected { count: usize },
}
