// ABOUTME: Error types for workflow description loading
// ABOUTME: Defines the failures that abort a load before any step executes

use thiserror::Error;

use super::step::StepPath;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read workflow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid workflow format at {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    #[error("Missing required field '{field}' at {path}")]
    MissingField { field: String, path: String },

    #[error("Unknown step type '{tag}' at {path}. Supported types: {supported:?}")]
    InvalidStepType {
        tag: String,
        path: StepPath,
        supported: Vec<&'static str>,
    },
}

impl ParserError {
    /// Attach the location of the offending descriptor.
    pub(crate) fn at(self, location: &StepPath) -> Self {
        match self {
            ParserError::InvalidStepType { tag, supported, .. } => ParserError::InvalidStepType {
                tag,
                path: location.clone(),
                supported,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParserError>;
