// ABOUTME: Error types for step execution
// ABOUTME: Every execution failure unwinds to the runner through these variants

use thiserror::Error;

use crate::parser::{StepPath, StepType};

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Step '{step_type}' is missing required parameter '{parameter}'")]
    MissingParameter {
        step_type: StepType,
        parameter: String,
    },

    #[error("Step '{step_type}' has invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        step_type: StepType,
        parameter: String,
        reason: String,
    },

    #[error("Invalid condition operator '{operator}'. Expected 'and' or 'or'")]
    InvalidOperator { operator: String },

    #[error("Capability '{capability}' is not available: {reason}")]
    CapabilityUnavailable {
        capability: &'static str,
        reason: String,
    },

    #[error("Capability '{capability}' failed: {message}")]
    CapabilityFailed {
        capability: &'static str,
        message: String,
    },

    #[error("No execution rule registered for step type '{step_type}'")]
    UnhandledStepType { step_type: StepType },

    #[error("Step nesting depth {depth} exceeds the limit of {limit}")]
    NestingTooDeep { depth: usize, limit: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Step {path} ({step_type}) failed: {source}")]
    StepFailed {
        path: StepPath,
        step_type: StepType,
        #[source]
        source: Box<ExecutionError>,
    },
}

impl ExecutionError {
    pub(crate) fn capability_failed(capability: &'static str, error: impl std::fmt::Display) -> Self {
        ExecutionError::CapabilityFailed {
            capability,
            message: error.to_string(),
        }
    }

    /// Wrap the error with the location of the step that raised it.
    ///
    /// Errors that already carry a location pass through unchanged, so the
    /// reported path is always the innermost failing step.
    pub fn at_step(self, path: &StepPath, step_type: StepType) -> Self {
        match self {
            located @ ExecutionError::StepFailed { .. } => located,
            other => ExecutionError::StepFailed {
                path: path.clone(),
                step_type,
                source: Box::new(other),
            },
        }
    }

    /// The underlying failure, with any location wrapper removed.
    pub fn root_cause(&self) -> &ExecutionError {
        match self {
            ExecutionError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Location of the failing step, when known.
    pub fn path(&self) -> Option<&StepPath> {
        match self {
            ExecutionError::StepFailed { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
