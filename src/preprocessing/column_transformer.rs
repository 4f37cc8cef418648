//! ColumnTransformer: routes named columns to their fitted transformer and
//! concatenates the outputs.
//!
//! Steps are applied in declaration order; each step's output occupies a
//! contiguous block of the design row. Every input feature is consumed by
//! exactly one step.

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::one_hot::{FittedOneHotEncoder, OneHotEncoderParams};
use crate::preprocessing::scaling::{FittedStandardScaler, StandardScalerParams};
use crate::preprocessing::traits::{check_out_width, FittedParams, FittedTransformer};
use crate::schema::FeatureSpec;
use crate::validation::FeatureValue;
use ndarray::{s, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serializable parameters of one step's transformer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformerParams {
    StandardScaler(StandardScalerParams),
    OneHotEncoder(OneHotEncoderParams),
}

/// Serializable parameters for a fitted column transformer step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepParams {
    /// Feature names this step consumes, in the transformer's column order.
    pub columns: Vec<String>,
    pub transformer: TransformerParams,
}

/// Serializable parameters for a fitted ColumnTransformer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformerParams {
    /// Input feature order.
    pub feature_names: Vec<String>,
    pub steps: Vec<StepParams>,
}

/// Enum of fitted transformers for ColumnTransformer.
#[derive(Clone, Debug)]
pub enum FittedColumnTransformerStep {
    StandardScaler(FittedStandardScaler),
    OneHotEncoder(FittedOneHotEncoder),
}

impl FittedColumnTransformerStep {
    fn from_params(params: TransformerParams) -> Result<Self, PreprocessingError> {
        match params {
            TransformerParams::StandardScaler(p) => {
                FittedStandardScaler::from_params(p).map(Self::StandardScaler)
            }
            TransformerParams::OneHotEncoder(p) => {
                FittedOneHotEncoder::from_params(p).map(Self::OneHotEncoder)
            }
        }
    }

    fn extract_params(&self) -> TransformerParams {
        match self {
            Self::StandardScaler(t) => TransformerParams::StandardScaler(t.extract_params()),
            Self::OneHotEncoder(t) => TransformerParams::OneHotEncoder(t.extract_params()),
        }
    }

    /// Get the step name.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::StandardScaler(_) => "StandardScaler",
            Self::OneHotEncoder(_) => "OneHotEncoder",
        }
    }

    fn n_features_in(&self) -> usize {
        match self {
            Self::StandardScaler(t) => t.n_features_in(),
            Self::OneHotEncoder(t) => FittedTransformer::<[&str]>::n_features_in(t),
        }
    }

    fn n_features_out(&self) -> usize {
        match self {
            Self::StandardScaler(t) => t.n_features_out(),
            Self::OneHotEncoder(t) => FittedTransformer::<[&str]>::n_features_out(t),
        }
    }
}

#[derive(Clone, Debug)]
struct FittedStep {
    names: Vec<String>,
    // Positions of `names` in the input row.
    columns: Vec<usize>,
    offset: usize,
    transformer: FittedColumnTransformerStep,
}

impl FittedStep {
    fn transform_into(
        &self,
        row: &[FeatureValue],
        out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), PreprocessingError> {
        match &self.transformer {
            FittedColumnTransformerStep::StandardScaler(scaler) => {
                let mut sample = Vec::with_capacity(self.columns.len());
                for (name, &col) in self.names.iter().zip(&self.columns) {
                    let value = row[col].as_f64().ok_or_else(|| PreprocessingError::ColumnKind {
                        feature: name.clone(),
                        expected: "numeric",
                    })?;
                    sample.push(value);
                }
                scaler.transform_into(sample.as_slice(), out)
            }
            FittedColumnTransformerStep::OneHotEncoder(encoder) => {
                let mut sample = Vec::with_capacity(self.columns.len());
                for (name, &col) in self.names.iter().zip(&self.columns) {
                    let value = row[col].as_str().ok_or_else(|| PreprocessingError::ColumnKind {
                        feature: name.clone(),
                        expected: "categorical",
                    })?;
                    sample.push(value);
                }
                encoder
                    .transform_into(sample.as_slice(), out)
                    .map_err(|err| match err {
                        PreprocessingError::UnknownCategory { column, value } => {
                            PreprocessingError::UnknownFeatureCategory {
                                feature: self.names[column].clone(),
                                value,
                            }
                        }
                        other => other,
                    })
            }
        }
    }
}

/// Fitted ColumnTransformer ready for inference.
#[derive(Clone, Debug)]
pub struct FittedColumnTransformer {
    feature_names: Vec<String>,
    steps: Vec<FittedStep>,
    n_features_out: usize,
}

impl FittedColumnTransformer {
    /// The feature set this transformer was fitted on, in input order.
    ///
    /// Scaler columns are numeric; encoder columns are categorical with the
    /// encoder's categories as their vocabulary.
    pub fn expected_features(&self) -> Vec<FeatureSpec> {
        let mut specs: Vec<Option<FeatureSpec>> = vec![None; self.feature_names.len()];
        for step in &self.steps {
            for (j, (name, &col)) in step.names.iter().zip(&step.columns).enumerate() {
                let spec = match &step.transformer {
                    FittedColumnTransformerStep::StandardScaler(_) => FeatureSpec::numeric(name),
                    FittedColumnTransformerStep::OneHotEncoder(enc) => {
                        FeatureSpec::categorical(name, enc.categories()[j].iter().cloned())
                    }
                };
                specs[col] = Some(spec);
            }
        }
        // from_params guarantees every column is covered.
        specs.into_iter().flatten().collect()
    }
}

impl FittedTransformer<[FeatureValue]> for FittedColumnTransformer {
    fn n_features_in(&self) -> usize {
        self.feature_names.len()
    }

    fn n_features_out(&self) -> usize {
        self.n_features_out
    }

    fn transform_into(
        &self,
        row: &[FeatureValue],
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), PreprocessingError> {
        if row.len() != self.feature_names.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.feature_names.len(),
                got_features: row.len(),
            });
        }
        check_out_width(&out, self.n_features_out)?;

        for step in &self.steps {
            let width = step.transformer.n_features_out();
            let block = out.slice_mut(s![step.offset..step.offset + width]);
            step.transform_into(row, block)?;
        }
        Ok(())
    }
}

impl FittedParams for FittedColumnTransformer {
    type Params = ColumnTransformerParams;

    fn extract_params(&self) -> Self::Params {
        ColumnTransformerParams {
            feature_names: self.feature_names.clone(),
            steps: self
                .steps
                .iter()
                .map(|step| StepParams {
                    columns: step.names.clone(),
                    transformer: step.transformer.extract_params(),
                })
                .collect(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.feature_names.is_empty() {
            return Err(PreprocessingError::InvalidParameter(
                "ColumnTransformer has no input features".to_string(),
            ));
        }
        if params.steps.is_empty() {
            return Err(PreprocessingError::InvalidParameter(
                "ColumnTransformer has no steps".to_string(),
            ));
        }

        let mut positions = HashMap::with_capacity(params.feature_names.len());
        for (i, name) in params.feature_names.iter().enumerate() {
            if positions.insert(name.as_str(), i).is_some() {
                return Err(PreprocessingError::InvalidParameter(format!(
                    "feature `{}` is listed twice",
                    name
                )));
            }
        }

        let mut consumed = vec![false; params.feature_names.len()];
        let mut steps = Vec::with_capacity(params.steps.len());
        let mut offset = 0;

        for (index, step) in params.steps.into_iter().enumerate() {
            if step.columns.is_empty() {
                return Err(PreprocessingError::InvalidParameter(format!(
                    "step {} has no columns",
                    index
                )));
            }

            let mut columns = Vec::with_capacity(step.columns.len());
            for name in &step.columns {
                let &col = positions.get(name.as_str()).ok_or_else(|| {
                    PreprocessingError::InvalidParameter(format!(
                        "step {} uses unknown feature `{}`",
                        index, name
                    ))
                })?;
                if std::mem::replace(&mut consumed[col], true) {
                    return Err(PreprocessingError::InvalidParameter(format!(
                        "feature `{}` is consumed by more than one step",
                        name
                    )));
                }
                columns.push(col);
            }

            let transformer = FittedColumnTransformerStep::from_params(step.transformer)?;
            if transformer.n_features_in() != columns.len() {
                return Err(PreprocessingError::InvalidParameter(format!(
                    "step {} ({}) expects {} columns but lists {}",
                    index,
                    transformer.step_name(),
                    transformer.n_features_in(),
                    columns.len()
                )));
            }

            let width = transformer.n_features_out();
            steps.push(FittedStep {
                names: step.columns,
                columns,
                offset,
                transformer,
            });
            offset += width;
        }

        if let Some(col) = consumed.iter().position(|used| !used) {
            return Err(PreprocessingError::InvalidParameter(format!(
                "feature `{}` is not consumed by any step",
                params.feature_names[col]
            )));
        }

        Ok(Self {
            feature_names: params.feature_names,
            steps,
            n_features_out: offset,
        })
    }
}
