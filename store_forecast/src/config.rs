//! Configuration of the monthly update run

use crate::error::{ForecastError, Result};
use crate::skeleton::{DEFAULT_HORIZON_MONTHS, DEFAULT_WEEKS_PER_MONTH};
use crate::training::DEFAULT_BOOST_ROUNDS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File locations and run parameters; every field has a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Newly observed actuals for this cycle
    pub monthly_batch_path: PathBuf,
    /// Master dataset, read at start and overwritten at the end
    pub master_path: PathBuf,
    /// Model artifact to warm start from
    pub model_path: PathBuf,
    /// Hyperparameter record from the tuning phase
    pub params_path: PathBuf,
    /// Directory receiving the new model artifact
    pub output_dir: PathBuf,
    pub horizon_months: usize,
    pub boost_rounds: usize,
    pub weeks_per_month: usize,
    /// Optional CSV of actual vs predicted sales for reporting
    pub downstream_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            monthly_batch_path: PathBuf::from("Data/monthly_data.csv"),
            master_path: PathBuf::from("Data/base_data.csv"),
            model_path: PathBuf::from("best_xgb_model_init.bin"),
            params_path: PathBuf::from("best_xgb_params.json"),
            output_dir: PathBuf::from("Data"),
            horizon_months: DEFAULT_HORIZON_MONTHS,
            boost_rounds: DEFAULT_BOOST_ROUNDS,
            weeks_per_month: DEFAULT_WEEKS_PER_MONTH,
            downstream_path: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from JSON; missing fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.boost_rounds == 0 {
            return Err(ForecastError::InvalidParameter(
                "boost_rounds must be greater than zero".to_string(),
            ));
        }
        if self.weeks_per_month == 0 {
            return Err(ForecastError::InvalidParameter(
                "weeks_per_month must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
