use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the prediction and model APIs.
///
/// Missing history is not an error: form, head-to-head and rest lookups
/// fall back to documented defaults instead.
#[derive(Error, Debug)]
pub enum PredictError {
    /// Unknown team name or abbreviation. Fails one request, never a batch.
    #[error("Team not found: {0}")]
    TeamNotFound(String),

    /// Classifier or scaler not trained/persisted yet.
    #[error("Missing {artifact} at {}: train the model first", path.display())]
    MissingArtifact { artifact: &'static str, path: PathBuf },

    /// Classifier or scaler used before `fit`.
    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PredictError {
    /// True for the "not configured yet" family, as opposed to bad input.
    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, Self::MissingArtifact { .. } | Self::NotFitted(_))
    }
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;
