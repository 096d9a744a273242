//! Error types surfaced to the operator.
//!
//! Every variant is fatal: the binary prints the message and exits with
//! status 1.

use crate::config::ConfigError;
use crate::deploy::Step;
use thiserror::Error;

/// Why an operator's menu input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no selection entered")]
    Empty,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("'{0}' is negative")]
    Negative(String),

    #[error("{index} is out of range (valid: 0-{})", count.saturating_sub(1))]
    OutOfRange { index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("no branches found")]
    EmptyBranchSet,

    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    #[error("{step} failed: {cause:#}")]
    StepFailed { step: Step, cause: anyhow::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to determine working directory: {0}")]
    WorkingDirectory(std::io::Error),
}

impl DeployError {
    /// The step that failed, if the error came from a delegated command.
    pub fn step(&self) -> Option<&Step> {
        match self {
            DeployError::StepFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}
