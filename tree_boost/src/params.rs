//! Booster hyperparameters

use crate::{BoostError, Result};
use serde::{Deserialize, Serialize};

/// Loss minimized by the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Objective {
    /// Squared-error regression (`reg:squarederror`)
    #[default]
    SquaredError,
}

impl Objective {
    /// First and second derivative of the loss with respect to the prediction
    pub fn gradient(&self, prediction: f64, label: f64) -> (f64, f64) {
        match self {
            Objective::SquaredError => (prediction - label, 1.0),
        }
    }
}

/// Hyperparameters controlling how each boosting round grows a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    /// Loss function
    pub objective: Objective,
    /// Shrinkage applied to every leaf weight (eta)
    pub learning_rate: f64,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum hessian sum required in each child of a split
    pub min_child_weight: f64,
    /// Minimum loss reduction required to make a split
    pub gamma: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Fraction of features sampled for each tree
    pub colsample_bytree: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Seed for row and feature sampling
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            objective: Objective::SquaredError,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            seed: 0,
        }
    }
}

impl BoostParams {
    /// Check that every parameter lies in its valid range
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            return Err(BoostError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        if self.max_depth == 0 {
            return Err(BoostError::InvalidParameter(
                "max_depth must be at least 1".to_string(),
            ));
        }

        let non_negative = [
            ("min_child_weight", self.min_child_weight),
            ("gamma", self.gamma),
            ("reg_alpha", self.reg_alpha),
            ("reg_lambda", self.reg_lambda),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(BoostError::InvalidParameter(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        let ratios = [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ];
        for (name, value) in ratios {
            if !(value > 0.0 && value <= 1.0) {
                return Err(BoostError::InvalidParameter(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
