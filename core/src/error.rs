use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One row that failed schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowViolation {
    /// Zero-based position of the row in the dataset being validated.
    pub row:        usize,
    pub invoice_no: String,
    pub field:      String,
    pub reason:     String,
}

impl fmt::Display for RowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} (invoice {}): {} {}",
            self.row, self.invoice_no, self.field, self.reason
        )
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Required input missing at {location}")]
    MissingInput { location: String },

    #[error("Optional input missing at {location}")]
    MissingOptionalInput { location: String },

    #[error("Schema violation in {dataset}: {} offending rows", .violations.len())]
    SchemaViolation {
        dataset:    String,
        violations: Vec<RowViolation>,
    },

    #[error("Cannot form 5 score bins for {metric}: {reason}")]
    DegenerateDistribution {
        metric: &'static str,
        reason: String,
    },

    #[error("Invalid setting {setting}: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason:  String,
    },

    #[error("Unknown segment label '{label}'")]
    UnknownSegment { label: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
