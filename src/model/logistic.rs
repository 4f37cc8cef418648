//! Binary logistic regression: `p = sigmoid(w · x + b)`.

use crate::model::{InferenceModel, ModelError};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Serializable representation of logistic model parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// A fitted logistic classifier emitting positive-class probabilities.
#[derive(Clone, Debug)]
pub struct LogisticModel {
    weights: Array1<f64>,
    bias: f64,
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let ez = z.exp();
        ez / (1.0 + ez)
    }
}

impl LogisticModel {
    pub fn from_params(params: LogisticParams) -> Result<Self, ModelError> {
        if params.weights.is_empty() {
            return Err(ModelError::InvalidParameter("no weights".to_string()));
        }
        if let Some(i) = params.weights.iter().position(|w| !w.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "weight {} is not finite",
                i
            )));
        }
        if !params.bias.is_finite() {
            return Err(ModelError::InvalidParameter(
                "bias is not finite".to_string(),
            ));
        }
        Ok(Self {
            weights: Array1::from(params.weights),
            bias: params.bias,
        })
    }

    pub fn extract_params(&self) -> LogisticParams {
        LogisticParams {
            weights: self.weights.to_vec(),
            bias: self.bias,
        }
    }

    /// Number of design columns the model was trained on.
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Raw scores `w · x + b` for every row.
    pub fn decision_function(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        if x.ncols() != self.weights.len() {
            return Err(ModelError::FeatureMismatch {
                expected: self.weights.len(),
                got: x.ncols(),
            });
        }
        Ok(x.dot(&self.weights) + self.bias)
    }

    /// Positive-class probability for every row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }
}

impl InferenceModel for LogisticModel {
    type InputBatch = Array2<f64>;
    type OutputBatch = Result<Array1<f64>, ModelError>;

    fn predict_batch(&self, input: &Self::InputBatch) -> Self::OutputBatch {
        self.predict_proba(input.view())
    }
}
