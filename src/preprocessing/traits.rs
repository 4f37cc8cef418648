//! Core traits for fitted preprocessing transformers.
//!
//! Fitting happens offline, so only the inference side lives here:
//! - [`FittedTransformer`]: turns one sample into a slice of the design row.
//! - [`FittedParams`]: round-trips a fitted transformer through plain parameters.

use crate::preprocessing::error::PreprocessingError;
use crate::serialization::SerializableParams;
use ndarray::{Array1, ArrayViewMut1};

/// A fitted transformer ready for inference.
///
/// `I` is the sample type: `[f64]` for scalers, `[S: AsRef<str>]` for
/// encoders, `[FeatureValue]` for the column transformer.
pub trait FittedTransformer<I: ?Sized> {
    /// Number of input columns seen during fit.
    fn n_features_in(&self) -> usize;

    /// Width of the transformed output.
    fn n_features_out(&self) -> usize;

    /// Transform one sample, writing exactly `n_features_out` values into `out`.
    ///
    /// # Errors
    /// Returns [`PreprocessingError`] if the sample width or `out` width is
    /// wrong, or if a value cannot be encoded.
    fn transform_into(&self, sample: &I, out: ArrayViewMut1<'_, f64>)
        -> Result<(), PreprocessingError>;

    /// Transform one sample into a freshly allocated row.
    fn transform_row(&self, sample: &I) -> Result<Array1<f64>, PreprocessingError> {
        let mut out = Array1::zeros(self.n_features_out());
        self.transform_into(sample, out.view_mut())?;
        Ok(out)
    }
}

/// A fitted component that can be rebuilt from its serializable parameters.
///
/// # Guarantees
/// - `extract_params()` + `from_params()` is a round-trip.
/// - `from_params` rejects inconsistent parameters instead of panicking later.
pub trait FittedParams: Sized {
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;

    /// Extract learned parameters as a serializable representation.
    fn extract_params(&self) -> Self::Params;

    /// Reconstruct a fitted component from parameters.
    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError>;
}

/// Check that an output view has the width a transformer writes.
pub(crate) fn check_out_width(
    out: &ArrayViewMut1<'_, f64>,
    expected: usize,
) -> Result<(), PreprocessingError> {
    if out.len() != expected {
        return Err(PreprocessingError::FeatureMismatch {
            expected_features: expected,
            got_features: out.len(),
        });
    }
    Ok(())
}
