//! # Tree Boost
//!
//! Gradient-boosted regression trees with warm-start training.
//! This crate provides the ensemble used by the store forecasting pipeline:
//! an exact greedy, second-order tree learner and a booster that can keep
//! growing an existing ensemble instead of retraining it from scratch.
//!
//! ```
//! use tree_boost::{BoostParams, Booster, FeatureMatrix};
//!
//! let names = vec!["x".to_string()];
//! let rows = (0..20).map(|i| vec![i as f64]).collect();
//! let labels = (0..20).map(|i| if i < 10 { 1.0 } else { 5.0 }).collect();
//! let matrix = FeatureMatrix::new(names, rows).unwrap().with_labels(labels).unwrap();
//!
//! let mut booster = Booster::train(BoostParams::default(), &matrix, 10).unwrap();
//! booster.boost(&matrix, 5).unwrap();
//! assert_eq!(booster.num_trees(), 15);
//! ```

use thiserror::Error;

pub mod booster;
pub mod matrix;
pub mod params;
pub mod tree;

pub use booster::Booster;
pub use matrix::FeatureMatrix;
pub use params::{BoostParams, Objective};
pub use tree::{RegressionTree, TreeNode};

/// Errors that can occur while training, evaluating or storing an ensemble
#[derive(Error, Debug)]
pub enum BoostError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Feature mismatch: expected {expected:?}, found {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Incompatible model artifact: {0}")]
    Incompatible(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for BoostError {
    fn from(err: bincode::Error) -> Self {
        BoostError::Serialization(err.to_string())
    }
}

/// Result type for boosting operations
pub type Result<T> = std::result::Result<T, BoostError>;
