//! The trained pipeline artifact: column transformer plus logistic classifier.
//!
//! An artifact is a [`PipelineParams`] document, stored as bincode or, for
//! files ending in `.json`, as JSON. Loading validates the whole document up
//! front so that a bad artifact stops the process at startup rather than
//! failing on the first request.

use crate::model::{InferenceModel, LogisticModel, LogisticParams, ModelError};
use crate::preprocessing::{
    ColumnTransformerParams, FittedColumnTransformer, FittedParams, FittedTransformer,
    PreprocessingError,
};
use crate::schema::FeatureSpec;
use crate::serialization::SerializableParams;
use crate::validation::FeatureValue;
use ndarray::{Array1, Array2, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Artifact layout version this build understands.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Positive-class decision threshold for [`ARTIFACT_FORMAT_VERSION`].
///
/// Baked into the trained artifact as well; the two must agree, and a retrain
/// that moves the threshold has to bump the format version.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Serializable parameters for the whole pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub format_version: u32,
    pub decision_threshold: f64,
    pub preprocessor: ColumnTransformerParams,
    pub model: LogisticParams,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("cannot access pipeline artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode binary pipeline artifact: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("cannot decode JSON pipeline artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported artifact format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("artifact decision threshold {found} differs from {expected} for this format version")]
    ThresholdMismatch { found: f64, expected: f64 },
    #[error("invalid preprocessor: {0}")]
    Preprocessing(#[from] PreprocessingError),
    #[error("invalid classifier: {0}")]
    Model(#[from] ModelError),
    #[error("preprocessor emits {preprocessor} columns but the classifier has {model} weights")]
    WidthMismatch { preprocessor: usize, model: usize },
}

/// On-disk encoding, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactEncoding {
    Bincode,
    Json,
}

impl ArtifactEncoding {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ArtifactEncoding::Json,
            _ => ArtifactEncoding::Bincode,
        }
    }
}

/// A loaded, read-only pipeline.
#[derive(Clone, Debug)]
pub struct Pipeline {
    preprocessor: FittedColumnTransformer,
    model: LogisticModel,
}

impl Pipeline {
    pub fn from_params(params: PipelineParams) -> Result<Self, ArtifactError> {
        if params.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: params.format_version,
                supported: ARTIFACT_FORMAT_VERSION,
            });
        }
        if params.decision_threshold != DECISION_THRESHOLD {
            return Err(ArtifactError::ThresholdMismatch {
                found: params.decision_threshold,
                expected: DECISION_THRESHOLD,
            });
        }

        let preprocessor = FittedColumnTransformer::from_params(params.preprocessor)?;
        let model = LogisticModel::from_params(params.model)?;
        if preprocessor.n_features_out() != model.n_features() {
            return Err(ArtifactError::WidthMismatch {
                preprocessor: preprocessor.n_features_out(),
                model: model.n_features(),
            });
        }

        Ok(Self {
            preprocessor,
            model,
        })
    }

    pub fn extract_params(&self) -> PipelineParams {
        PipelineParams {
            format_version: ARTIFACT_FORMAT_VERSION,
            decision_threshold: DECISION_THRESHOLD,
            preprocessor: self.preprocessor.extract_params(),
            model: self.model.extract_params(),
        }
    }

    /// Decode an artifact from bytes in the given encoding.
    pub fn from_bytes(bytes: &[u8], encoding: ArtifactEncoding) -> Result<Self, ArtifactError> {
        let params = match encoding {
            ArtifactEncoding::Bincode => PipelineParams::from_bytes(bytes)?,
            ArtifactEncoding::Json => serde_json::from_slice(bytes)?,
        };
        Self::from_params(params)
    }

    /// Encode the pipeline in the given encoding.
    pub fn to_bytes(&self, encoding: ArtifactEncoding) -> Result<Vec<u8>, ArtifactError> {
        let params = self.extract_params();
        Ok(match encoding {
            ArtifactEncoding::Bincode => params.to_bytes()?,
            ArtifactEncoding::Json => serde_json::to_vec_pretty(&params)?,
        })
    }

    /// Load a pipeline from a file; `.json` files are read as JSON, anything
    /// else as bincode.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let encoding = ArtifactEncoding::for_path(path);
        let pipeline = Self::from_bytes(&bytes, encoding)?;
        info!(
            path = %path.display(),
            ?encoding,
            format_version = ARTIFACT_FORMAT_VERSION,
            features_in = pipeline.n_features_in(),
            features_out = pipeline.n_features_out(),
            "loaded pipeline artifact"
        );
        Ok(pipeline)
    }

    /// Save the pipeline, picking the encoding from the extension.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let bytes = self.to_bytes(ArtifactEncoding::for_path(path))?;
        std::fs::write(path, bytes).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The input feature set the pipeline was trained on.
    pub fn expected_features(&self) -> Vec<FeatureSpec> {
        self.preprocessor.expected_features()
    }

    pub fn n_features_in(&self) -> usize {
        self.preprocessor.n_features_in()
    }

    /// Width of the design row.
    pub fn n_features_out(&self) -> usize {
        self.preprocessor.n_features_out()
    }

    pub fn decision_threshold(&self) -> f64 {
        DECISION_THRESHOLD
    }

    /// Encode one schema-ordered record into a design row.
    pub fn encode_into(
        &self,
        values: &[FeatureValue],
        out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), PreprocessingError> {
        self.preprocessor.transform_into(values, out)
    }

    /// Positive-class probabilities for a design matrix.
    pub fn predict_proba(&self, design: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        self.model.predict_batch(design)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::preprocessing::{OneHotEncoderParams, StandardScalerParams, StepParams, TransformerParams};
    use crate::schema::FeatureKind;

    /// A tiny two-feature pipeline: `age` scaled, `contact` one-hot.
    pub(crate) fn small_params() -> PipelineParams {
        PipelineParams {
            format_version: ARTIFACT_FORMAT_VERSION,
            decision_threshold: DECISION_THRESHOLD,
            preprocessor: ColumnTransformerParams {
                feature_names: vec!["age".into(), "contact".into()],
                steps: vec![
                    StepParams {
                        columns: vec!["age".into()],
                        transformer: TransformerParams::StandardScaler(StandardScalerParams {
                            mean: vec![40.0],
                            std: vec![10.0],
                        }),
                    },
                    StepParams {
                        columns: vec!["contact".into()],
                        transformer: TransformerParams::OneHotEncoder(OneHotEncoderParams {
                            categories: vec![vec!["cellular".into(), "telephone".into()]],
                        }),
                    },
                ],
            },
            model: LogisticParams {
                weights: vec![1.0, 0.5, -0.5],
                bias: 0.0,
            },
        }
    }

    #[test]
    fn test_pipeline_from_params() {
        let pipeline = Pipeline::from_params(small_params()).unwrap();
        assert_eq!(pipeline.n_features_in(), 2);
        assert_eq!(pipeline.n_features_out(), 3);
        assert_eq!(pipeline.decision_threshold(), 0.5);
        let specs = pipeline.expected_features();
        assert_eq!(specs[0].kind, FeatureKind::Numeric);
        assert!(specs[1].is_categorical());
    }

    #[test]
    fn test_pipeline_rejects_unknown_version() {
        let mut params = small_params();
        params.format_version = 2;
        assert!(matches!(
            Pipeline::from_params(params),
            Err(ArtifactError::UnsupportedVersion {
                found: 2,
                supported: 1
            })
        ));
    }

    #[test]
    fn test_pipeline_rejects_threshold_drift() {
        let mut params = small_params();
        params.decision_threshold = 0.4;
        assert!(matches!(
            Pipeline::from_params(params),
            Err(ArtifactError::ThresholdMismatch { .. })
        ));
    }

    #[test]
    fn test_pipeline_rejects_width_mismatch() {
        let mut params = small_params();
        params.model.weights.push(0.1);
        assert!(matches!(
            Pipeline::from_params(params),
            Err(ArtifactError::WidthMismatch {
                preprocessor: 3,
                model: 4
            })
        ));
    }

    #[test]
    fn test_pipeline_encode_and_score() {
        let pipeline = Pipeline::from_params(small_params()).unwrap();
        let mut design = Array2::zeros((1, 3));
        pipeline
            .encode_into(
                &[
                    FeatureValue::Numeric(40.0),
                    FeatureValue::Categorical("cellular".into()),
                ],
                design.row_mut(0),
            )
            .unwrap();
        let p = pipeline.predict_proba(&design).unwrap();
        // z = 0 + 0.5
        assert!((p[0] - crate::model::logistic::sigmoid(0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_pipeline_save_load_both_encodings() {
        let pipeline = Pipeline::from_params(small_params()).unwrap();
        for name in ["bankmark_test_pipeline.bin", "bankmark_test_pipeline.json"] {
            let path = std::env::temp_dir().join(name);
            pipeline.save_to_file(&path).unwrap();
            let loaded = Pipeline::load_from_file(&path).unwrap();
            std::fs::remove_file(&path).ok();
            assert_eq!(loaded.extract_params(), small_params());
        }
    }

    #[test]
    fn test_pipeline_load_missing_file() {
        let path = std::env::temp_dir().join("bankmark_no_such_pipeline.bin");
        assert!(matches!(
            Pipeline::load_from_file(&path),
            Err(ArtifactError::Io { .. })
        ));
    }

    #[test]
    fn test_pipeline_load_garbage() {
        let pipeline_bytes = b"definitely not a pipeline";
        assert!(Pipeline::from_bytes(pipeline_bytes, ArtifactEncoding::Bincode).is_err());
        assert!(matches!(
            Pipeline::from_bytes(pipeline_bytes, ArtifactEncoding::Json),
            Err(ArtifactError::Json(_))
        ));
    }

    #[test]
    fn test_encoding_for_path() {
        assert_eq!(
            ArtifactEncoding::for_path(Path::new("m/pipeline.JSON")),
            ArtifactEncoding::Json
        );
        assert_eq!(
            ArtifactEncoding::for_path(Path::new("m/pipeline.bin")),
            ArtifactEncoding::Bincode
        );
        assert_eq!(
            ArtifactEncoding::for_path(Path::new("pipeline")),
            ArtifactEncoding::Bincode
        );
    }
}
