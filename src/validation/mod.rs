//! Input validation: untrusted raw records in, normalized records out.
//!
//! For every feature of the [`SchemaRegistry`], in order, the validator
//!
//! 1. checks presence (absent, `null` and blank text all count as missing,
//!    and a documented default fills the gap when one exists),
//! 2. coerces the value to the feature's kind,
//! 3. for categorical features, checks membership in the trained vocabulary.
//!
//! The first failure ends validation of that record. Fields the schema does
//! not know are ignored. Records in a batch are validated independently.

mod raw;

pub use raw::{RawRecord, RawValue};

use crate::schema::{DefaultValue, FeatureKind, FeatureSpec, SchemaRegistry};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a raw record was rejected.
///
/// Serializes with a `kind` tag so a front end can hand it to clients as-is.
#[derive(Clone, Debug, PartialEq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    #[error("field `{field}` cannot be coerced to the expected type (received {received})")]
    TypeMismatch { field: String, received: RawValue },
    #[error(
        "field `{field}` has unknown category {received:?} (allowed: {})",
        .allowed.join(", ")
    )]
    UnknownCategory {
        field: String,
        received: String,
        allowed: Vec<String>,
    },
}

/// Discriminant of [`ValidationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingField,
    TypeMismatch,
    UnknownCategory,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::MissingField { .. } => ValidationErrorKind::MissingField,
            ValidationError::TypeMismatch { .. } => ValidationErrorKind::TypeMismatch,
            ValidationError::UnknownCategory { .. } => ValidationErrorKind::UnknownCategory,
        }
    }

    /// Name of the offending feature.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::TypeMismatch { field, .. }
            | ValidationError::UnknownCategory { field, .. } => field,
        }
    }
}

/// A typed, vocabulary-checked feature value.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(n) => Some(*n),
            FeatureValue::Categorical(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Categorical(s) => Some(s),
            FeatureValue::Numeric(_) => None,
        }
    }
}

impl From<&DefaultValue> for FeatureValue {
    fn from(default: &DefaultValue) -> Self {
        match default {
            DefaultValue::Number(n) => FeatureValue::Numeric(*n),
            DefaultValue::Text(s) => FeatureValue::Categorical(s.clone()),
        }
    }
}

/// A record that passed validation.
///
/// Holds exactly one value per schema feature, in schema order. Only the
/// [`Validator`] can build one, so anything typed `NormalizedRecord` is safe to
/// hand to the prediction engine.
#[derive(Clone, Debug)]
pub struct NormalizedRecord {
    schema: Arc<SchemaRegistry>,
    values: Vec<FeatureValue>,
}

impl NormalizedRecord {
    fn new(schema: Arc<SchemaRegistry>, values: Vec<FeatureValue>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    /// Values in schema order.
    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.schema.position(name).map(|i| &self.values[i])
    }

    /// `(feature name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.schema
            .features()
            .iter()
            .map(|spec| spec.name.as_str())
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Registry this record was validated against.
    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }
}

impl PartialEq for NormalizedRecord {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

/// Stateless validator over a shared schema registry.
#[derive(Clone, Debug)]
pub struct Validator {
    schema: Arc<SchemaRegistry>,
}

impl Validator {
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    /// Validate and normalize one record.
    pub fn validate_one(&self, raw: &RawRecord) -> Result<NormalizedRecord, ValidationError> {
        let mut values = Vec::with_capacity(self.schema.len());
        for (position, spec) in self.schema.features().iter().enumerate() {
            values.push(self.normalize_field(position, spec, raw.get(&spec.name))?);
        }
        Ok(NormalizedRecord::new(Arc::clone(&self.schema), values))
    }

    /// Validate each record independently; output order and length match the input.
    pub fn validate_many(
        &self,
        raws: &[RawRecord],
    ) -> Vec<Result<NormalizedRecord, ValidationError>> {
        let results: Vec<_> = raws.iter().map(|raw| self.validate_one(raw)).collect();
        let rejected = results.iter().filter(|r| r.is_err()).count();
        debug!(records = raws.len(), rejected, "validated batch");
        results
    }

    fn normalize_field(
        &self,
        position: usize,
        spec: &FeatureSpec,
        raw: Option<&RawValue>,
    ) -> Result<FeatureValue, ValidationError> {
        let raw = match raw {
            Some(value) if !value.is_blank() => value,
            _ => {
                return spec
                    .default
                    .as_ref()
                    .map(FeatureValue::from)
                    .ok_or_else(|| ValidationError::MissingField {
                        field: spec.name.clone(),
                    });
            }
        };

        let type_mismatch = || ValidationError::TypeMismatch {
            field: spec.name.clone(),
            received: raw.clone(),
        };

        match &spec.kind {
            FeatureKind::Numeric => {
                let number = match raw {
                    RawValue::Number(n) => Some(*n),
                    RawValue::Text(s) => s.trim().parse::<f64>().ok(),
                    RawValue::Missing => None,
                };
                match number {
                    Some(n) if n.is_finite() => Ok(FeatureValue::Numeric(n)),
                    _ => Err(type_mismatch()),
                }
            }
            FeatureKind::Categorical { allowed_values } => {
                let RawValue::Text(text) = raw else {
                    return Err(type_mismatch());
                };
                if self.schema.is_allowed(position, text) {
                    Ok(FeatureValue::Categorical(text.clone()))
                } else {
                    Err(ValidationError::UnknownCategory {
                        field: spec.name.clone(),
                        received: text.clone(),
                        allowed: allowed_values.clone(),
                    })
                }
            }
        }
    }
}
