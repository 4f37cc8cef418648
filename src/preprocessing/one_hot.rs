//! One-hot encoding for string categorical features.
//!
//! Each input column owns an ordered category list. A value is encoded as a
//! block of zeros with a single one at the category's position; blocks are
//! laid out in column order.

use crate::preprocessing::error::PreprocessingError;
use crate::preprocessing::traits::{check_out_width, FittedParams, FittedTransformer};
use ndarray::ArrayViewMut1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serializable parameters for a fitted OneHotEncoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoderParams {
    /// Categories for each input column, in output order.
    pub categories: Vec<Vec<String>>,
}

/// Fitted OneHotEncoder ready for inference.
///
/// Unknown categories are always an error; encoding them as all zeros would
/// hand the classifier a row it was never trained on.
#[derive(Clone, Debug)]
pub struct FittedOneHotEncoder {
    categories: Vec<Vec<String>>,
    lookup: Vec<HashMap<String, usize>>,
    // Start of each column's block in the output row.
    offsets: Vec<usize>,
    n_features_out: usize,
}

impl FittedOneHotEncoder {
    /// Get the categories learned for each column.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Index of `value` within column `column`'s category list.
    pub fn category_index(&self, column: usize, value: &str) -> Option<usize> {
        self.lookup.get(column)?.get(value).copied()
    }
}

impl<S: AsRef<str>> FittedTransformer<[S]> for FittedOneHotEncoder {
    fn n_features_in(&self) -> usize {
        self.categories.len()
    }

    fn n_features_out(&self) -> usize {
        self.n_features_out
    }

    fn transform_into(
        &self,
        sample: &[S],
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), PreprocessingError> {
        if sample.len() != self.categories.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected_features: self.categories.len(),
                got_features: sample.len(),
            });
        }
        check_out_width(&out, self.n_features_out)?;

        out.fill(0.0);
        for (column, value) in sample.iter().enumerate() {
            let value = value.as_ref();
            let index = self.category_index(column, value).ok_or_else(|| {
                PreprocessingError::UnknownCategory {
                    column,
                    value: value.to_string(),
                }
            })?;
            out[self.offsets[column] + index] = 1.0;
        }
        Ok(())
    }
}

impl FittedParams for FittedOneHotEncoder {
    type Params = OneHotEncoderParams;

    fn extract_params(&self) -> Self::Params {
        OneHotEncoderParams {
            categories: self.categories.clone(),
        }
    }

    fn from_params(params: Self::Params) -> Result<Self, PreprocessingError> {
        if params.categories.is_empty() {
            return Err(PreprocessingError::InvalidParameter(
                "OneHotEncoder has no columns".to_string(),
            ));
        }

        let mut lookup = Vec::with_capacity(params.categories.len());
        let mut offsets = Vec::with_capacity(params.categories.len());
        let mut n_features_out = 0;

        for (column, cats) in params.categories.iter().enumerate() {
            if cats.is_empty() {
                return Err(PreprocessingError::InvalidParameter(format!(
                    "OneHotEncoder column {} has no categories",
                    column
                )));
            }
            let mut index = HashMap::with_capacity(cats.len());
            for (i, cat) in cats.iter().enumerate() {
                if index.insert(cat.clone(), i).is_some() {
                    return Err(PreprocessingError::InvalidParameter(format!(
                        "OneHotEncoder column {} lists {:?} twice",
                        column, cat
                    )));
                }
            }
            offsets.push(n_features_out);
            n_features_out += cats.len();
            lookup.push(index);
        }

        Ok(Self {
            categories: params.categories,
            lookup,
            offsets,
            n_features_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    fn encoder() -> FittedOneHotEncoder {
        FittedOneHotEncoder::from_params(OneHotEncoderParams {
            categories: vec![
                vec!["no".into(), "yes".into(), "unknown".into()],
                vec!["cellular".into(), "telephone".into()],
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_one_hot_widths() {
        let enc = encoder();
        assert_eq!(FittedTransformer::<[&str]>::n_features_in(&enc), 2);
        assert_eq!(FittedTransformer::<[&str]>::n_features_out(&enc), 5);
    }

    #[test]
    fn test_one_hot_transform_row() {
        let enc = encoder();
        let row = enc.transform_row(&["yes", "telephone"][..]).unwrap();
        assert_eq!(row, array![0.0, 1.0, 0.0, 0.0, 1.0]);

        let row = enc
            .transform_row(&["unknown".to_string(), "cellular".to_string()][..])
            .unwrap();
        assert_eq!(row, array![0.0, 0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_one_hot_clears_previous_output() {
        let enc = encoder();
        let mut out = Array1::from_elem(5, 7.0);
        enc.transform_into(&["no", "cellular"][..], out.view_mut()).unwrap();
        assert_eq!(out, array![1.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_one_hot_unknown_category_is_error() {
        let enc = encoder();
        let err = enc.transform_row(&["no", "pigeon"][..]).unwrap_err();
        assert!(matches!(
            err,
            PreprocessingError::UnknownCategory { column: 1, ref value } if value == "pigeon"
        ));
    }

    #[test]
    fn test_one_hot_feature_mismatch() {
        let enc = encoder();
        assert!(matches!(
            enc.transform_row(&["no"][..]),
            Err(PreprocessingError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_one_hot_rejects_bad_params() {
        let dup = OneHotEncoderParams {
            categories: vec![vec!["a".into(), "a".into()]],
        };
        assert!(FittedOneHotEncoder::from_params(dup).is_err());

        let empty_column = OneHotEncoderParams {
            categories: vec![vec!["a".into()], vec![]],
        };
        assert!(FittedOneHotEncoder::from_params(empty_column).is_err());

        let no_columns = OneHotEncoderParams { categories: vec![] };
        assert!(FittedOneHotEncoder::from_params(no_columns).is_err());
    }

    #[test]
    fn test_one_hot_params_roundtrip() {
        let enc = encoder();
        let restored = FittedOneHotEncoder::from_params(enc.extract_params()).unwrap();
        assert_eq!(restored.categories(), enc.categories());
        assert_eq!(restored.category_index(1, "telephone"), Some(1));
    }
}
