//! Fatal errors and per-record warnings.
//!
//! A stage either fails the whole run with a [`PipelineError`] or hands back
//! its value together with the [`Warning`]s for every unit it skipped.

use std::path::PathBuf;
use tracing::warn;

/// Errors that abort the run before any output is written.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required input file does not exist.
    #[error("could not find required file '{}'", path.display())]
    MissingInput { path: PathBuf },

    /// The factor table has no real header row.
    #[error("'{}' has no header row at line 2", path.display())]
    EmptyTable { path: PathBuf },

    /// A column the loader depends on is absent.
    #[error("'{}' has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A recoverable anomaly. The offending row, cell, bucket or score entry is
/// skipped and processing carries on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    #[error("event log '{}' not found, proceeding without event data", path.display())]
    EventLogMissing { path: PathBuf },

    #[error("row {row}: unparseable timestamp '{raw}'")]
    UnparseableTimestamp { row: usize, raw: String },

    #[error("factor '{factor}' at '{time_range}': non-numeric value '{raw}'")]
    NonNumericValue {
        factor: String,
        time_range: String,
        raw: String,
    },

    #[error("'Final Score' row not found in the factor table")]
    MissingFinalScoreRow,

    #[error("skipping invalid time range '{label}'")]
    InvalidTimeRange { label: String },

    #[error("unknown category '{category}' at '{time_range}'")]
    UnknownCategory { time_range: String, category: String },
}

/// Output of a stage that completed, plus what it had to skip.
#[derive(Debug, Clone)]
pub struct Staged<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Staged<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Record a warning and log it immediately.
    pub fn warn(&mut self, warning: Warning) {
        warn!(kind = warning.kind(), "{}", warning);
        self.warnings.push(warning);
    }
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EventLogMissing { .. } => "event_log_missing",
            Self::UnparseableTimestamp { .. } => "unparseable_timestamp",
            Self::NonNumericValue { .. } => "non_numeric_value",
            Self::MissingFinalScoreRow => "missing_final_score_row",
            Self::InvalidTimeRange { .. } => "invalid_time_range",
            Self::UnknownCategory { .. } => "unknown_category",
        }
    }
}
