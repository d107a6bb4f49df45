//! Sales models driven by the pipeline

use crate::error::{ForecastError, Result};
use std::fmt::Debug;
use tree_boost::{BoostParams, FeatureMatrix};

/// Model that predicts weekly sales from a feature matrix
pub trait SalesModel: Debug {
    /// Name of the model
    fn name(&self) -> &str;

    /// Feature columns the model was trained on, in order
    fn feature_names(&self) -> &[String];

    /// Predict one value per row of `matrix`
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>>;
}

/// Model whose training can be continued on new labeled rows
pub trait IncrementalModel: SalesModel {
    /// Number of trees (or equivalent capacity units) in the model
    fn tree_count(&self) -> usize;

    /// Replace the hyperparameters used by subsequent training
    fn apply_params(&mut self, params: BoostParams) -> Result<()>;

    /// Append `rounds` rounds of training on `matrix`
    fn continue_training(&mut self, matrix: &FeatureMatrix, rounds: usize) -> Result<()>;
}

/// Fail unless `matrix` carries exactly the columns `model` expects
pub fn check_feature_layout<M: SalesModel + ?Sized>(model: &M, matrix: &FeatureMatrix) -> Result<()> {
    if model.feature_names() == matrix.feature_names() {
        Ok(())
    } else {
        Err(ForecastError::PredictionShapeMismatch {
            expected: model.feature_names().to_vec(),
            found: matrix.feature_names().to_vec(),
        })
    }
}

pub mod gradient_boosting;
