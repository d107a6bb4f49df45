//! Warm-start training of the ensemble on newly labeled rows

use crate::error::{ForecastError, Result};
use crate::features::FeatureFrame;
use crate::metrics::{fit_accuracy, FitAccuracy};
use crate::models::IncrementalModel;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use tree_boost::{BoostParams, Booster, Objective};

/// Boosting rounds appended per monthly cycle
pub const DEFAULT_BOOST_ROUNDS: usize = 50;

/// Rounds used to build the initial ensemble when the record names none
pub const DEFAULT_BOOTSTRAP_ROUNDS: usize = 100;

/// Rows dated before this year form the initial training set
pub const DEFAULT_BOOTSTRAP_CUTOFF_YEAR: i32 = 2012;

const SQUARED_ERROR_OBJECTIVE: &str = "reg:squarederror";

/// Hyperparameters produced by the one-time tuning phase
///
/// Field names follow the tuning output. Absent fields fall back to the
/// engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperParameterRecord {
    pub learning_rate: Option<f64>,
    pub max_depth: Option<usize>,
    pub min_child_weight: Option<f64>,
    pub gamma: Option<f64>,
    pub subsample: Option<f64>,
    pub colsample_bytree: Option<f64>,
    pub reg_alpha: Option<f64>,
    pub reg_lambda: Option<f64>,
    /// Total tree count of the tuned model; only used when bootstrapping
    pub n_estimators: Option<usize>,
    pub objective: Option<String>,
    pub random_state: Option<u64>,
    /// Accepted for compatibility; training is single-threaded
    pub n_jobs: Option<i64>,
}

impl HyperParameterRecord {
    /// Read a record from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Engine parameters for this record, with the objective forced to squared error
    pub fn to_boost_params(&self) -> Result<BoostParams> {
        if let Some(objective) = self.objective.as_deref() {
            if objective != SQUARED_ERROR_OBJECTIVE {
                warn!(objective, "Overriding tuned objective with squared error");
            }
        }

        let defaults = BoostParams::default();
        let params = BoostParams {
            objective: Objective::SquaredError,
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            min_child_weight: self.min_child_weight.unwrap_or(defaults.min_child_weight),
            gamma: self.gamma.unwrap_or(defaults.gamma),
            subsample: self.subsample.unwrap_or(defaults.subsample),
            colsample_bytree: self.colsample_bytree.unwrap_or(defaults.colsample_bytree),
            reg_alpha: self.reg_alpha.unwrap_or(defaults.reg_alpha),
            reg_lambda: self.reg_lambda.unwrap_or(defaults.reg_lambda),
            seed: self.random_state.unwrap_or(defaults.seed),
        };

        params
            .validate()
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        Ok(params)
    }
}

/// Outcome of one warm-start training step
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Labeled rows with complete features used for training
    pub rows: usize,
    pub trees_before: usize,
    pub trees_after: usize,
    /// In-sample accuracy after training
    pub fit: FitAccuracy,
}

/// Continues training an existing model for a fixed number of rounds
#[derive(Debug, Clone, Copy)]
pub struct IncrementalTrainer {
    rounds: usize,
}

impl IncrementalTrainer {
    pub fn new(rounds: usize) -> Result<Self> {
        if rounds == 0 {
            return Err(ForecastError::InvalidParameter(
                "Boosting rounds must be greater than zero".to_string(),
            ));
        }
        Ok(Self { rounds })
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Apply the frozen hyperparameters and append rounds on every labeled usable row
    pub fn train<M: IncrementalModel>(
        &self,
        model: &mut M,
        params: &BoostParams,
        frame: &FeatureFrame,
    ) -> Result<TrainingSummary> {
        let matrix = frame.training_matrix()?;
        if matrix.is_empty() {
            return Err(ForecastError::DataError(
                "No labeled rows with complete features to train on".to_string(),
            ));
        }

        model.apply_params(params.clone())?;
        let trees_before = model.tree_count();
        model.continue_training(&matrix, self.rounds)?;
        let trees_after = model.tree_count();

        let fitted = model.predict(&matrix)?;
        let labels = matrix.labels().unwrap_or_default();
        let fit = fit_accuracy(&fitted, labels)?;

        info!(
            rows = matrix.n_rows(),
            trees_before,
            trees_after,
            "Warm-start training finished: {}",
            fit
        );

        Ok(TrainingSummary {
            rows: matrix.n_rows(),
            trees_before,
            trees_after,
            fit,
        })
    }
}

impl Default for IncrementalTrainer {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_BOOST_ROUNDS,
        }
    }
}

/// Build the initial ensemble from labeled rows dated before `cutoff_year`
///
/// Used once, before the first monthly cycle; later cycles only warm start.
pub fn bootstrap_model(
    frame: &FeatureFrame,
    record: &HyperParameterRecord,
    cutoff_year: i32,
) -> Result<Booster> {
    let params = record.to_boost_params()?;
    let rounds = record.n_estimators.unwrap_or(DEFAULT_BOOTSTRAP_ROUNDS);
    if rounds == 0 {
        return Err(ForecastError::InvalidParameter(
            "n_estimators must be greater than zero".to_string(),
        ));
    }

    let matrix = frame.training_matrix_where(|r| r.date.year() < cutoff_year)?;
    if matrix.is_empty() {
        return Err(ForecastError::DataError(format!(
            "No labeled rows with complete features before {}",
            cutoff_year
        )));
    }

    let booster = Booster::train(params, &matrix, rounds)?;
    info!(
        rows = matrix.n_rows(),
        trees = booster.num_trees(),
        cutoff_year,
        "Bootstrapped initial ensemble"
    );
    Ok(booster)
}
