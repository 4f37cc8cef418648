//! Error types for preprocessing operations.

use thiserror::Error;

/// Error type for preprocessing operations.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// Input width does not match what the transformer was fitted on.
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },
    /// A category the encoder never saw, reported by input column index.
    #[error("Unknown category {value:?} in column {column}")]
    UnknownCategory { column: usize, value: String },
    /// A category the encoder never saw, reported by feature name.
    #[error("Unknown category {value:?} for feature `{feature}`")]
    UnknownFeatureCategory { feature: String, value: String },
    /// A value of the wrong kind reached a column.
    #[error("Feature `{feature}` expects a {expected} value")]
    ColumnKind {
        feature: String,
        expected: &'static str,
    },
    /// Fitted parameters are inconsistent.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
