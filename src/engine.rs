//! Prediction engine: normalized records in, calibrated probabilities out.
//!
//! The engine owns a shared, read-only [`Pipeline`] and never sees raw input.
//! Batches are encoded row by row into one design matrix and scored with a
//! single matrix-vector product. [`PredictionEngine::predict_one`] is the
//! one-element case of [`PredictionEngine::predict_many`], so single and batch
//! predictions cannot diverge.

use crate::error::StartupError;
use crate::model::ModelError;
use crate::pipeline::{Pipeline, DECISION_THRESHOLD};
use crate::preprocessing::PreprocessingError;
use crate::schema::SchemaRegistry;
use crate::validation::NormalizedRecord;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::slice;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Failure to score a structurally valid record.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("record was validated against a different schema registry")]
    ForeignRecord,
    #[error("failed to encode record: {0}")]
    Encoding(#[source] PreprocessingError),
    #[error("failed to score batch: {0}")]
    Scoring(String),
    #[error("classifier produced an invalid probability {0}")]
    InvalidProbability(f64),
    #[error("engine returned no result")]
    NoOutput,
}

impl From<&ModelError> for PredictionError {
    fn from(err: &ModelError) -> Self {
        PredictionError::Scoring(err.to_string())
    }
}

/// Decision for one record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredictionResult {
    /// `true` for the positive class ("yes", the client subscribes).
    pub label: bool,
    pub probability_positive: f64,
}

impl PredictionResult {
    /// Apply the fixed decision threshold to a positive-class probability.
    pub fn from_probability(probability_positive: f64) -> Self {
        Self {
            label: probability_positive >= DECISION_THRESHOLD,
            probability_positive,
        }
    }

    pub fn probability_negative(&self) -> f64 {
        1.0 - self.probability_positive
    }

    /// Probability of the predicted class.
    pub fn confidence(&self) -> f64 {
        self.probability_positive.max(self.probability_negative())
    }

    /// `1` for the positive class, `0` otherwise.
    pub fn prediction(&self) -> u8 {
        u8::from(self.label)
    }

    pub fn prediction_label(&self) -> &'static str {
        if self.label {
            "yes"
        } else {
            "no"
        }
    }

    pub fn to_response(&self) -> PredictionResponse {
        PredictionResponse::from(*self)
    }
}

/// Client-facing rendering of a [`PredictionResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: u8,
    pub prediction_label: String,
    pub probability_no: f64,
    pub probability_yes: f64,
    pub confidence: f64,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            prediction: result.prediction(),
            prediction_label: result.prediction_label().to_string(),
            probability_no: result.probability_negative(),
            probability_yes: result.probability_positive,
            confidence: result.confidence(),
        }
    }
}

/// Stateless scorer over a shared pipeline.
#[derive(Clone, Debug)]
pub struct PredictionEngine {
    pipeline: Arc<Pipeline>,
    schema: Arc<SchemaRegistry>,
}

impl PredictionEngine {
    /// Bind a pipeline to the registry whose records it will score.
    ///
    /// Fails if the registry does not describe exactly the features the
    /// pipeline was trained on.
    pub fn new(pipeline: Arc<Pipeline>, schema: Arc<SchemaRegistry>) -> Result<Self, StartupError> {
        schema
            .check_compatible(&pipeline.expected_features())
            .map_err(StartupError::SchemaMismatch)?;
        info!(
            features = schema.len(),
            design_width = pipeline.n_features_out(),
            threshold = DECISION_THRESHOLD,
            "prediction engine ready"
        );
        Ok(Self { pipeline, schema })
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    /// Score one record.
    pub fn predict_one(&self, record: &NormalizedRecord) -> Result<PredictionResult, PredictionError> {
        self.predict_many(slice::from_ref(record))
            .into_iter()
            .next()
            .unwrap_or(Err(PredictionError::NoOutput))
    }

    /// Score a batch; output order and length match the input.
    ///
    /// A record that cannot be encoded fails on its own; the rest of the batch
    /// is still scored.
    pub fn predict_many(
        &self,
        records: &[NormalizedRecord],
    ) -> Vec<Result<PredictionResult, PredictionError>> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut design = Array2::zeros((records.len(), self.pipeline.n_features_out()));
        let encoded: Vec<Result<(), PredictionError>> = records
            .iter()
            .zip(design.rows_mut())
            .map(|(record, row)| {
                if !Arc::ptr_eq(record.schema(), &self.schema) {
                    return Err(PredictionError::ForeignRecord);
                }
                self.pipeline
                    .encode_into(record.values(), row)
                    .map_err(PredictionError::Encoding)
            })
            .collect();

        let probabilities = self.pipeline.predict_proba(&design);

        let results: Vec<_> = encoded
            .into_iter()
            .enumerate()
            .map(|(i, encoded)| {
                encoded?;
                let p = match &probabilities {
                    Ok(p) => p[i],
                    Err(err) => return Err(PredictionError::from(err)),
                };
                if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                    return Err(PredictionError::InvalidProbability(p));
                }
                Ok(PredictionResult::from_probability(p))
            })
            .collect();

        let mut failed = 0;
        for (index, err) in results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
        {
            error!(index, error = %err, "prediction failed");
            failed += 1;
        }
        debug!(records = records.len(), failed, "scored batch");
        results
    }
}
