//! Validator and engine behind one handle, for front ends that deal in raw input.

use crate::config::ServeConfig;
use crate::engine::{PredictionEngine, PredictionResult};
use crate::error::{ServeError, StartupError};
use crate::pipeline::Pipeline;
use crate::schema::{bank_marketing, SchemaRegistry};
use crate::validation::{RawRecord, ValidationError, Validator};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How a batch with invalid records is handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Score valid records, report invalid ones in place.
    #[default]
    Partial,
    /// Refuse the whole batch if any record is invalid.
    RejectOnAnyInvalid,
}

/// One invalid record of a rejected batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InvalidRecord {
    pub index: usize,
    pub error: ValidationError,
}

/// Returned by [`BatchPolicy::RejectOnAnyInvalid`] when validation fails.
#[derive(Clone, Debug, PartialEq, Error, Serialize)]
#[error("batch rejected: {} of {total} records are invalid", .invalid.len())]
pub struct BatchRejected {
    pub total: usize,
    /// Every invalid record, in input order.
    pub invalid: Vec<InvalidRecord>,
}

/// Aggregate view of a scored batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub predicted_yes: usize,
    pub predicted_no: usize,
    pub failed: usize,
    /// Mean confidence over successful predictions, `None` if there are none.
    pub mean_confidence: Option<f64>,
}

impl BatchSummary {
    pub fn from_results<E>(results: &[Result<PredictionResult, E>]) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            ..Default::default()
        };
        let mut confidence_sum = 0.0;
        for result in results {
            match result {
                Ok(r) if r.label => summary.predicted_yes += 1,
                Ok(_) => summary.predicted_no += 1,
                Err(_) => summary.failed += 1,
            }
            if let Ok(r) = result {
                confidence_sum += r.confidence();
            }
        }
        let scored = summary.predicted_yes + summary.predicted_no;
        if scored > 0 {
            summary.mean_confidence = Some(confidence_sum / scored as f64);
        }
        summary
    }
}

/// Process-wide prediction service. Cheap to clone; share freely across threads.
#[derive(Clone, Debug)]
pub struct Predictor {
    validator: Validator,
    engine: PredictionEngine,
}

impl Predictor {
    pub fn new(schema: Arc<SchemaRegistry>, pipeline: Arc<Pipeline>) -> Result<Self, StartupError> {
        let engine = PredictionEngine::new(pipeline, Arc::clone(&schema))?;
        Ok(Self {
            validator: Validator::new(schema),
            engine,
        })
    }

    /// Load the schema and pipeline named by `config`.
    pub fn from_config(config: &ServeConfig) -> Result<Self, StartupError> {
        let schema = match &config.schema_path {
            Some(path) => {
                info!(path = %path.display(), "loading schema file");
                SchemaRegistry::from_json_file(path)?
            }
            None => bank_marketing()?,
        };
        let pipeline = Pipeline::load_from_file(&config.pipeline_path)?;
        Self::new(Arc::new(schema), Arc::new(pipeline))
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        self.validator.schema()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn engine(&self) -> &PredictionEngine {
        &self.engine
    }

    /// Validate and score one raw record.
    pub fn predict(&self, raw: &RawRecord) -> Result<PredictionResult, ServeError> {
        let record = self.validator.validate_one(raw)?;
        Ok(self.engine.predict_one(&record)?)
    }

    /// Validate and score a batch, reporting failures in place.
    pub fn predict_batch(&self, raws: &[RawRecord]) -> Vec<Result<PredictionResult, ServeError>> {
        let mut results: Vec<Option<Result<PredictionResult, ServeError>>> =
            Vec::with_capacity(raws.len());
        let mut valid = Vec::new();
        let mut valid_index = Vec::new();

        for (i, validated) in self.validator.validate_many(raws).into_iter().enumerate() {
            match validated {
                Ok(record) => {
                    valid.push(record);
                    valid_index.push(i);
                    results.push(None);
                }
                Err(err) => results.push(Some(Err(err.into()))),
            }
        }

        for (i, scored) in valid_index
            .into_iter()
            .zip(self.engine.predict_many(&valid))
        {
            results[i] = Some(scored.map_err(ServeError::from));
        }

        debug!(
            records = raws.len(),
            invalid = raws.len() - valid.len(),
            "processed batch"
        );
        results.into_iter().flatten().collect()
    }

    /// Like [`predict_batch`](Self::predict_batch), but under an explicit policy.
    pub fn predict_batch_with_policy(
        &self,
        raws: &[RawRecord],
        policy: BatchPolicy,
    ) -> Result<Vec<Result<PredictionResult, ServeError>>, BatchRejected> {
        match policy {
            BatchPolicy::Partial => Ok(self.predict_batch(raws)),
            BatchPolicy::RejectOnAnyInvalid => {
                let mut valid = Vec::with_capacity(raws.len());
                let mut invalid = Vec::new();
                for (index, validated) in
                    self.validator.validate_many(raws).into_iter().enumerate()
                {
                    match validated {
                        Ok(record) => valid.push(record),
                        Err(error) => invalid.push(InvalidRecord { index, error }),
                    }
                }
                if !invalid.is_empty() {
                    warn!(
                        records = raws.len(),
                        invalid = invalid.len(),
                        "batch rejected"
                    );
                    return Err(BatchRejected {
                        total: raws.len(),
                        invalid,
                    });
                }
                Ok(self
                    .engine
                    .predict_many(&valid)
                    .into_iter()
                    .map(|r| r.map_err(ServeError::from))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::small_params;
    use crate::schema::FeatureSpec;
    use crate::validation::ValidationErrorKind;

    fn predictor() -> Predictor {
        let schema = Arc::new(
            SchemaRegistry::new(vec![
                FeatureSpec::numeric("age"),
                FeatureSpec::categorical("contact", ["cellular", "telephone"]),
            ])
            .unwrap(),
        );
        let pipeline = Arc::new(Pipeline::from_params(small_params()).unwrap());
        Predictor::new(schema, pipeline).unwrap()
    }

    fn raw(age: f64, contact: &str) -> RawRecord {
        RawRecord::new().with("age", age).with("contact", contact)
    }

    #[test]
    fn test_predict_single() {
        let p = predictor();
        let result = p.predict(&raw(60.0, "cellular")).unwrap();
        assert!(result.label);

        let err = p.predict(&raw(60.0, "fax")).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_predict_batch_partial() {
        let p = predictor();
        let raws = vec![
            raw(30.0, "cellular"),
            RawRecord::new().with("contact", "cellular"),
            raw(55.0, "telephone"),
        ];
        let results = p.predict_batch(&raws);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &p.predict(&raws[0]).unwrap()
        );
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(
            err.as_validation().map(ValidationError::kind),
            Some(ValidationErrorKind::MissingField)
        );
        assert_eq!(
            results[2].as_ref().unwrap(),
            &p.predict(&raws[2]).unwrap()
        );
    }

    #[test]
    fn test_reject_on_any_invalid_lists_every_index() {
        let p = predictor();
        let raws = vec![
            RawRecord::new().with("contact", "cellular"),
            raw(30.0, "cellular"),
            raw(30.0, "pigeon"),
        ];
        let rejected = p
            .predict_batch_with_policy(&raws, BatchPolicy::RejectOnAnyInvalid)
            .unwrap_err();
        assert_eq!(rejected.total, 3);
        let indices: Vec<usize> = rejected.invalid.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert!(rejected.to_string().contains("2 of 3"));
    }

    #[test]
    fn test_reject_on_any_invalid_accepts_clean_batch() {
        let p = predictor();
        let raws = vec![raw(30.0, "cellular"), raw(50.0, "telephone")];
        let results = p
            .predict_batch_with_policy(&raws, BatchPolicy::RejectOnAnyInvalid)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_batch_summary() {
        let results: Vec<Result<PredictionResult, ()>> = vec![
            Ok(PredictionResult::from_probability(0.9)),
            Ok(PredictionResult::from_probability(0.3)),
            Err(()),
            Ok(PredictionResult::from_probability(0.2)),
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.predicted_yes, 1);
        assert_eq!(summary.predicted_no, 2);
        assert_eq!(summary.failed, 1);
        let mean = summary.mean_confidence.unwrap();
        assert!((mean - (0.9 + 0.7 + 0.8) / 3.0).abs() < 1e-12);

        let empty = BatchSummary::from_results::<()>(&[]);
        assert_eq!(empty.mean_confidence, None);
    }

    #[test]
    fn test_predictor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predictor>();
    }
}
