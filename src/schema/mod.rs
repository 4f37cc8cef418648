//! Schema registry: the ordered feature set the trained pipeline expects.
//!
//! The registry is built once at startup and shared read-only (behind an
//! `Arc`) by the validator and the prediction engine. It answers three kinds
//! of question:
//!
//! - which features exist, and in which order ([`SchemaRegistry::features`])
//! - what kind each feature is, and its default if one is documented
//! - for categorical features, the closed vocabulary the encoder was trained on
//!   ([`SchemaRegistry::allowed_values`], [`SchemaRegistry::categories`])
//!
//! A malformed schema, or one that disagrees with the loaded pipeline, is a
//! startup failure. It never surfaces as a per-request error.

mod bank;

pub use bank::{bank_marketing, bank_marketing_features};

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Semantic type of one input feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Real-valued feature, coerced to `f64`.
    Numeric,
    /// String-valued feature restricted to a fixed vocabulary.
    Categorical {
        /// Accepted values, in declaration order.
        allowed_values: Vec<String>,
    },
}

impl FeatureKind {
    /// Short lowercase name used in logs and mismatch messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Numeric => "numeric",
            FeatureKind::Categorical { .. } => "categorical",
        }
    }
}

/// Value substituted for a feature that is absent from a raw record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Number(n) => write!(f, "{}", n),
            DefaultValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Description of one input feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl FeatureSpec {
    /// A numeric feature without default.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Numeric,
            default: None,
        }
    }

    /// A categorical feature with the given vocabulary.
    pub fn categorical<I, S>(name: impl Into<String>, allowed_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: FeatureKind::Categorical {
                allowed_values: allowed_values.into_iter().map(Into::into).collect(),
            },
            default: None,
        }
    }

    /// Attach a documented default.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Vocabulary of a categorical feature, `None` for numeric ones.
    pub fn allowed_values(&self) -> Option<&[String]> {
        match &self.kind {
            FeatureKind::Categorical { allowed_values } => Some(allowed_values),
            FeatureKind::Numeric => None,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FeatureKind::Categorical { .. })
    }
}

/// Errors raised while building a registry or checking it against a pipeline.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema declares no features")]
    Empty,
    #[error("feature at position {position} has an empty name")]
    EmptyName { position: usize },
    #[error("feature `{0}` is declared more than once")]
    DuplicateFeature(String),
    #[error("categorical feature `{0}` has no allowed values")]
    EmptyVocabulary(String),
    #[error("categorical feature `{feature}` lists `{value}` more than once")]
    DuplicateCategory { feature: String, value: String },
    #[error("invalid default for `{feature}`: {reason}")]
    InvalidDefault { feature: String, reason: String },
    #[error("pipeline expects {expected} features, schema declares {declared}")]
    FeatureCountMismatch { expected: usize, declared: usize },
    #[error("feature #{position} `{feature}` does not match the pipeline: {detail}")]
    Mismatch {
        position: usize,
        feature: String,
        detail: String,
    },
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only registry of the expected input features.
#[derive(Debug)]
pub struct SchemaRegistry {
    features: Vec<FeatureSpec>,
    positions: HashMap<String, usize>,
    // One entry per feature; `Some` for categorical ones.
    vocabularies: Vec<Option<HashSet<String>>>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting malformed or incomplete feature lists.
    pub fn new(features: Vec<FeatureSpec>) -> Result<Self, SchemaError> {
        if features.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut positions = HashMap::with_capacity(features.len());
        let mut vocabularies = Vec::with_capacity(features.len());

        for (position, spec) in features.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(SchemaError::EmptyName { position });
            }
            if positions.insert(spec.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateFeature(spec.name.clone()));
            }

            let vocabulary = match &spec.kind {
                FeatureKind::Numeric => None,
                FeatureKind::Categorical { allowed_values } => {
                    if allowed_values.is_empty() {
                        return Err(SchemaError::EmptyVocabulary(spec.name.clone()));
                    }
                    let mut set = HashSet::with_capacity(allowed_values.len());
                    for value in allowed_values {
                        if !set.insert(value.clone()) {
                            return Err(SchemaError::DuplicateCategory {
                                feature: spec.name.clone(),
                                value: value.clone(),
                            });
                        }
                    }
                    Some(set)
                }
            };

            if let Some(default) = &spec.default {
                check_default(spec, default, vocabulary.as_ref())?;
            }
            vocabularies.push(vocabulary);
        }

        Ok(Self {
            features,
            positions,
            vocabularies,
        })
    }

    /// Parse a registry from a JSON array of feature specs.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let features: Vec<FeatureSpec> = serde_json::from_str(json)?;
        Self::new(features)
    }

    /// Load a registry from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Features in pipeline order.
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Look up a feature by name.
    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.position(name).map(|i| &self.features[i])
    }

    /// Position of a feature in pipeline order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Accepted vocabulary of a categorical feature.
    ///
    /// Returns `None` for numeric and unknown features.
    pub fn allowed_values(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FeatureSpec::allowed_values)
    }

    /// Every categorical feature with its vocabulary, in pipeline order.
    ///
    /// This is the introspection surface front ends use to render dropdowns
    /// and error messages with the exact accepted values.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.features
            .iter()
            .filter_map(|spec| spec.allowed_values().map(|v| (spec.name.as_str(), v)))
    }

    /// Membership test against the vocabulary of the feature at `position`.
    pub(crate) fn is_allowed(&self, position: usize, value: &str) -> bool {
        self.vocabularies
            .get(position)
            .and_then(Option::as_ref)
            .is_some_and(|vocab| vocab.contains(value))
    }

    /// Check that this registry describes exactly the features a pipeline expects.
    ///
    /// Names and kinds must agree position by position; categorical
    /// vocabularies must contain the same values (order may differ).
    pub fn check_compatible(&self, expected: &[FeatureSpec]) -> Result<(), SchemaError> {
        if expected.len() != self.features.len() {
            return Err(SchemaError::FeatureCountMismatch {
                expected: expected.len(),
                declared: self.features.len(),
            });
        }

        for (position, (ours, theirs)) in self.features.iter().zip(expected).enumerate() {
            let mismatch = |detail: String| SchemaError::Mismatch {
                position,
                feature: ours.name.clone(),
                detail,
            };

            if ours.name != theirs.name {
                return Err(mismatch(format!("pipeline has `{}` here", theirs.name)));
            }

            match (&ours.kind, &theirs.kind) {
                (FeatureKind::Numeric, FeatureKind::Numeric) => {}
                (
                    FeatureKind::Categorical { allowed_values: a },
                    FeatureKind::Categorical { allowed_values: b },
                ) => {
                    let declared: HashSet<&str> = a.iter().map(String::as_str).collect();
                    let trained: HashSet<&str> = b.iter().map(String::as_str).collect();
                    if declared != trained {
                        let mut missing: Vec<&str> =
                            trained.difference(&declared).copied().collect();
                        let mut extra: Vec<&str> =
                            declared.difference(&trained).copied().collect();
                        missing.sort_unstable();
                        extra.sort_unstable();
                        return Err(mismatch(format!(
                            "vocabulary differs (not declared: {:?}, unknown to encoder: {:?})",
                            missing, extra
                        )));
                    }
                }
                (a, b) => {
                    return Err(mismatch(format!(
                        "declared {}, pipeline expects {}",
                        a.as_str(),
                        b.as_str()
                    )));
                }
            }
        }

        Ok(())
    }
}

fn check_default(
    spec: &FeatureSpec,
    default: &DefaultValue,
    vocabulary: Option<&HashSet<String>>,
) -> Result<(), SchemaError> {
    let invalid = |reason: String| SchemaError::InvalidDefault {
        feature: spec.name.clone(),
        reason,
    };

    match (&spec.kind, default) {
        (FeatureKind::Numeric, DefaultValue::Number(n)) if n.is_finite() => Ok(()),
        (FeatureKind::Numeric, DefaultValue::Number(n)) => {
            Err(invalid(format!("{} is not a finite number", n)))
        }
        (FeatureKind::Categorical { .. }, DefaultValue::Text(s)) => {
            if vocabulary.is_some_and(|v| v.contains(s)) {
                Ok(())
            } else {
                Err(invalid(format!("{:?} is not an allowed value", s)))
            }
        }
        (kind, default) => Err(invalid(format!(
            "{} does not fit a {} feature",
            default,
            kind.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_schema() -> Vec<FeatureSpec> {
        vec![
            FeatureSpec::numeric("age"),
            FeatureSpec::categorical("month", ["mar", "apr", "may"]),
            FeatureSpec::numeric("N_last_days").with_default(DefaultValue::Number(999.0)),
        ]
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        let names: Vec<&str> = registry.features().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["age", "month", "N_last_days"]);
        assert_eq!(registry.position("month"), Some(1));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_allowed_values_lookup() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        assert_eq!(
            registry.allowed_values("month").unwrap(),
            &["mar".to_string(), "apr".to_string(), "may".to_string()]
        );
        assert!(registry.allowed_values("age").is_none());
        assert!(registry.allowed_values("missing").is_none());
    }

    #[test]
    fn test_categories_lists_only_categorical() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        let cats: Vec<&str> = registry.categories().map(|(name, _)| name).collect();
        assert_eq!(cats, vec!["month"]);
    }

    #[test]
    fn test_is_allowed() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        assert!(registry.is_allowed(1, "may"));
        assert!(!registry.is_allowed(1, "May"));
        assert!(!registry.is_allowed(0, "may"));
        assert!(!registry.is_allowed(42, "may"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(matches!(SchemaRegistry::new(vec![]), Err(SchemaError::Empty)));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let specs = vec![FeatureSpec::numeric("age"), FeatureSpec::numeric("age")];
        assert!(matches!(
            SchemaRegistry::new(specs),
            Err(SchemaError::DuplicateFeature(name)) if name == "age"
        ));
    }

    #[test]
    fn test_blank_name_rejected() {
        let specs = vec![FeatureSpec::numeric("age"), FeatureSpec::numeric("  ")];
        assert!(matches!(
            SchemaRegistry::new(specs),
            Err(SchemaError::EmptyName { position: 1 })
        ));
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let specs = vec![FeatureSpec::categorical("month", Vec::<String>::new())];
        assert!(matches!(
            SchemaRegistry::new(specs),
            Err(SchemaError::EmptyVocabulary(_))
        ));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let specs = vec![FeatureSpec::categorical("month", ["may", "may"])];
        assert!(matches!(
            SchemaRegistry::new(specs),
            Err(SchemaError::DuplicateCategory { .. })
        ));
    }

    #[test]
    fn test_default_must_match_kind() {
        let specs =
            vec![FeatureSpec::numeric("age").with_default(DefaultValue::Text("old".into()))];
        assert!(matches!(
            SchemaRegistry::new(specs),
            Err(SchemaError::InvalidDefault { .. })
        ));

        let specs = vec![FeatureSpec::categorical("month", ["may"])
            .with_default(DefaultValue::Text("jan".into()))];
        assert!(matches!(
            SchemaRegistry::new(specs),
            Err(SchemaError::InvalidDefault { .. })
        ));

        let specs =
            vec![FeatureSpec::numeric("age").with_default(DefaultValue::Number(f64::NAN))];
        assert!(SchemaRegistry::new(specs).is_err());
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"[
            {"name": "age", "kind": "numeric"},
            {"name": "month", "kind": "categorical", "allowed_values": ["may", "jun"]},
            {"name": "N_last_days", "kind": "numeric", "default": 999}
        ]"#;
        let registry = SchemaRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.get("month").unwrap().is_categorical());
        assert_eq!(
            registry.get("N_last_days").unwrap().default,
            Some(DefaultValue::Number(999.0))
        );
    }

    #[test]
    fn test_from_json_str_malformed() {
        assert!(matches!(
            SchemaRegistry::from_json_str("{not json"),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn test_from_json_file_missing() {
        let path = std::env::temp_dir().join("bankmark_no_such_schema.json");
        assert!(matches!(
            SchemaRegistry::from_json_file(path),
            Err(SchemaError::Io(_))
        ));
    }

    #[test]
    fn test_check_compatible_accepts_reordered_vocabulary() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        let expected = vec![
            FeatureSpec::numeric("age"),
            FeatureSpec::categorical("month", ["may", "mar", "apr"]),
            FeatureSpec::numeric("N_last_days"),
        ];
        assert!(registry.check_compatible(&expected).is_ok());
    }

    #[test]
    fn test_check_compatible_detects_reordering() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        let expected = vec![
            FeatureSpec::categorical("month", ["mar", "apr", "may"]),
            FeatureSpec::numeric("age"),
            FeatureSpec::numeric("N_last_days"),
        ];
        assert!(matches!(
            registry.check_compatible(&expected),
            Err(SchemaError::Mismatch { position: 0, .. })
        ));
    }

    #[test]
    fn test_check_compatible_detects_vocabulary_drift() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        let expected = vec![
            FeatureSpec::numeric("age"),
            FeatureSpec::categorical("month", ["mar", "apr", "may", "jun"]),
            FeatureSpec::numeric("N_last_days"),
        ];
        let err = registry.check_compatible(&expected).unwrap_err();
        assert!(err.to_string().contains("jun"));
    }

    #[test]
    fn test_check_compatible_detects_kind_and_count() {
        let registry = SchemaRegistry::new(small_schema()).unwrap();
        let expected = vec![
            FeatureSpec::numeric("age"),
            FeatureSpec::numeric("month"),
            FeatureSpec::numeric("N_last_days"),
        ];
        assert!(matches!(
            registry.check_compatible(&expected),
            Err(SchemaError::Mismatch { position: 1, .. })
        ));
        assert!(matches!(
            registry.check_compatible(&expected[..2]),
            Err(SchemaError::FeatureCountMismatch {
                expected: 2,
                declared: 3
            })
        ));
    }
}
