//! Pipeline error taxonomy.
//!
//! Every stage of a dashboard run returns `Result<_, PipelineError>`. The four
//! kinds are what the user sees: the presentation layer renders exactly one
//! message, prefixed by the kind tag.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::WarehouseError;
use crate::models::ModelError;

/// Discriminant of a [`PipelineError`], used for display tags and styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DataUnavailable,
    InsufficientData,
    ModelFitFailure,
    InvalidDateEncoding,
}

impl ErrorKind {
    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::DataUnavailable => "DataUnavailable",
            ErrorKind::InsufficientData => "InsufficientData",
            ErrorKind::ModelFitFailure => "ModelFitFailure",
            ErrorKind::InvalidDateEncoding => "InvalidDateEncoding",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A failure that aborts a dashboard run.
///
/// The `Display` form is the single user-facing message: `"<Kind>: <detail>"`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The warehouse query could not execute or the connection is unavailable.
    #[error("DataUnavailable: {0}")]
    DataUnavailable(String),

    /// The selected series is empty or too short for a model or window.
    #[error("InsufficientData: {0}")]
    InsufficientData(String),

    /// A model fit did not converge, hit its budget, or produced non-finite output.
    #[error("ModelFitFailure: {0}")]
    ModelFitFailure(String),

    /// A decomposed date key is not a real calendar date.
    #[error("InvalidDateEncoding: {0}")]
    InvalidDateEncoding(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::DataUnavailable(_) => ErrorKind::DataUnavailable,
            PipelineError::InsufficientData(_) => ErrorKind::InsufficientData,
            PipelineError::ModelFitFailure(_) => ErrorKind::ModelFitFailure,
            PipelineError::InvalidDateEncoding(_) => ErrorKind::InvalidDateEncoding,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.kind().tag()
    }

    /// Detail text without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            PipelineError::DataUnavailable(m)
            | PipelineError::InsufficientData(m)
            | PipelineError::ModelFitFailure(m)
            | PipelineError::InvalidDateEncoding(m) => m,
        }
    }
}

impl From<WarehouseError> for PipelineError {
    fn from(err: WarehouseError) -> Self {
        PipelineError::DataUnavailable(err.to_string())
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InsufficientData { .. } => PipelineError::InsufficientData(err.to_string()),
            other => PipelineError::ModelFitFailure(other.to_string()),
        }
    }
}
