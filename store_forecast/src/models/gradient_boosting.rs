//! Gradient-boosted tree ensemble as a sales model

use crate::error::{ForecastError, Result};
use crate::models::{check_feature_layout, IncrementalModel, SalesModel};
use std::path::Path;
use tree_boost::{BoostParams, Booster, FeatureMatrix};

impl SalesModel for Booster {
    fn name(&self) -> &str {
        "Gradient Boosted Trees"
    }

    fn feature_names(&self) -> &[String] {
        Booster::feature_names(self)
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        check_feature_layout(self, matrix)?;
        Ok(Booster::predict(self, matrix)?)
    }
}

impl IncrementalModel for Booster {
    fn tree_count(&self) -> usize {
        self.num_trees()
    }

    fn apply_params(&mut self, params: BoostParams) -> Result<()> {
        Ok(self.set_params(params)?)
    }

    fn continue_training(&mut self, matrix: &FeatureMatrix, rounds: usize) -> Result<()> {
        check_feature_layout(self, matrix)?;
        Ok(self.boost(matrix, rounds)?)
    }
}

/// Load a persisted ensemble; any failure to read it is fatal for the run
pub fn load_booster<P: AsRef<Path>>(path: P) -> Result<Booster> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ForecastError::MissingInputFile {
            path: path.to_path_buf(),
        });
    }

    Booster::load(path).map_err(|e| ForecastError::ModelLoadFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
