//! Fitted standard scaler (z-score normalization).
//!
//! ```text
//! z = (x - u) / s
//! ```
//! where `u` and `s` are the per-column mean and standard deviation learned
//! offline.

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{check_out_width, FittedParams, FittedTransformer};
use ndarray::{Array1, ArrayViewMut1};
use serde::{Deserialize, Serialize};

/// Serializable parameters for a fitted StandardScaler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScalerParams {
    /// Mean of each column.
    pub mean: Vec<f64>,
    /// Standard deviation of each column.
    pub std: Vec<f64>,
}

/// Fitted StandardScaler ready for inference.
#[derive(Clone, Debug)]
pub struct FittedStandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl FittedTransformer<[f64]> for FittedStandardScaler {
    fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    fn n_features_out(&self) -> usize {
        self.mean.len()
    }

    fn transform_into(
        &self,
        sample: &[f64],
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), PreprocessingError> {
        if sample.len() != self.mean.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.mean.len(),
                got_features: sample.len(),
            });
        }
        check_out_width(&out, self.mean.len())?;

        for (i, &x) in sample.iter().enumerate() {
            out[i] = (x - self.mean[i]) / self.std[i];
        }
        Ok(())
    }
}

impl FittedParams for FittedStandardScaler {
    type Params = StandardScalerParams;

    fn extract_params(&self) -> Self::Params {
        StandardScalerParams {
            mean: self.mean.to_vec(),
            std: self.std.to_vec(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.mean.is_empty() {
            return Err(PreprocessingError::InvalidParameter(
                "StandardScaler has no columns".to_string(),
            ));
        }
        if params.mean.len() != params.std.len() {
            return Err(PreprocessingError::InvalidParameter(format!(
                "StandardScaler has {} means but {} standard deviations",
                params.mean.len(),
                params.std.len()
            )));
        }
        if let Some(i) = params.mean.iter().position(|m| !m.is_finite()) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "StandardScaler mean of column {} is not finite",
                i
            )));
        }
        if let Some(i) = params.std.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "StandardScaler std of column {} must be finite and non-zero",
                i
            )));
        }

        Ok(Self {
            mean: Array1::from(params.mean),
            std: Array1::from(params.std),
        })
    }
}
