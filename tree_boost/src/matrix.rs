//! Dense feature matrix with named columns

use crate::{BoostError, Result};

/// Row-major feature matrix, optionally carrying regression labels
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    feature_names: Vec<String>,
    values: Vec<f64>,
    n_rows: usize,
    labels: Option<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix from rows; every row must have one finite value per feature
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if feature_names.is_empty() {
            return Err(BoostError::InvalidInput(
                "Feature matrix needs at least one feature".to_string(),
            ));
        }

        let n_features = feature_names.len();
        let n_rows = rows.len();
        let mut values = Vec::with_capacity(n_rows * n_features);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_features {
                return Err(BoostError::InvalidInput(format!(
                    "Row {} has {} values, expected {}",
                    i,
                    row.len(),
                    n_features
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(BoostError::InvalidInput(format!(
                    "Row {} has a non-finite value in feature '{}'",
                    i, feature_names[j]
                )));
            }
            values.extend(row);
        }

        Ok(Self {
            feature_names,
            values,
            n_rows,
            labels: None,
        })
    }

    /// Attach regression labels, one per row
    pub fn with_labels(mut self, labels: Vec<f64>) -> Result<Self> {
        if labels.len() != self.n_rows {
            return Err(BoostError::InvalidInput(format!(
                "Got {} labels for {} rows",
                labels.len(),
                self.n_rows
            )));
        }
        if labels.iter().any(|v| !v.is_finite()) {
            return Err(BoostError::InvalidInput(
                "Labels must be finite".to_string(),
            ));
        }

        self.labels = Some(labels);
        Ok(self)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Values of row `i`
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.n_features();
        &self.values[i * n..(i + 1) * n]
    }

    /// Value at row `i`, feature `j`
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n_features() + j]
    }

    pub fn labels(&self) -> Option<&[f64]> {
        self.labels.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_row_access() {
        let matrix = FeatureMatrix::new(names(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.n_features(), 2);
        assert_eq!(matrix.row(1), &[3.0, 4.0]);
        assert_eq!(matrix.value(0, 1), 2.0);
        assert!(matrix.labels().is_none());
    }

    #[test]
    fn test_rejects_ragged_and_non_finite_rows() {
        assert!(FeatureMatrix::new(names(), vec![vec![1.0]]).is_err());
        assert!(FeatureMatrix::new(names(), vec![vec![1.0, f64::NAN]]).is_err());
        assert!(FeatureMatrix::new(Vec::new(), vec![]).is_err());
    }

    #[test]
    fn test_label_count_must_match_rows() {
        let matrix = FeatureMatrix::new(names(), vec![vec![1.0, 2.0]]).unwrap();
        assert!(matrix.clone().with_labels(vec![1.0, 2.0]).is_err());
        assert!(matrix.with_labels(vec![1.0]).is_ok());
    }

    #[test]
    fn test_empty_matrix_is_allowed() {
        let matrix = FeatureMatrix::new(names(), Vec::new()).unwrap();
        assert!(matrix.is_empty());
    }
}
