//! Fitted preprocessing transformers.
//!
//! Parameters are learned offline and loaded with the pipeline artifact; this
//! module only applies them. Every transformer writes one sample into a slice
//! of a preallocated design row, so a batch is encoded row by row and a bad row
//! never disturbs its neighbours.
//!
//! # Available Transformers
//!
//! - [`FittedStandardScaler`]: z-score normalization of numeric columns
//! - [`FittedOneHotEncoder`]: one-hot encoding of string categories
//! - [`FittedColumnTransformer`]: routes named features to the two above

pub mod column_transformer;
pub mod error;
pub mod one_hot;
pub mod scaling;
pub mod traits;

pub use column_transformer::{
    ColumnTransformerParams, FittedColumnTransformer, FittedColumnTransformerStep, StepParams,
    TransformerParams,
};
pub use error::PreprocessingError;
pub use one_hot::{FittedOneHotEncoder, OneHotEncoderParams};
pub use scaling::{FittedStandardScaler, StandardScalerParams};
pub use traits::{FittedParams, FittedTransformer};
