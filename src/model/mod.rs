//! Fitted classifiers.

pub mod logistic;

pub use logistic::{LogisticModel, LogisticParams};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model expects {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("invalid model parameter: {0}")]
    InvalidParameter(String),
}

/// Inference-only view of a fitted model.
///
/// Models score whole design matrices; a single record is a one-row batch.
pub trait InferenceModel {
    type InputBatch: ?Sized;
    type OutputBatch;

    fn predict_batch(&self, input: &Self::InputBatch) -> Self::OutputBatch;
}
