//! Top-level error types.

use crate::engine::PredictionError;
use crate::pipeline::ArtifactError;
use crate::schema::SchemaError;
use crate::validation::ValidationError;
use thiserror::Error;

/// Conditions that stop the process before it serves anything.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("schema does not match the loaded pipeline: {0}")]
    SchemaMismatch(#[source] SchemaError),
    #[error("cannot load pipeline: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Per-request failure as seen by a front end.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The caller sent bad input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The engine failed on well-formed input.
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl ServeError {
    /// Whether the caller can fix this by changing the input
    /// (a 4xx rather than a 5xx, in HTTP terms).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServeError::Validation(_))
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ServeError::Validation(err) => Some(err),
            ServeError::Prediction(_) => None,
        }
    }
}
