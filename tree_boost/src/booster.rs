//! Boosted ensemble with warm-start training and binary persistence

use crate::matrix::FeatureMatrix;
use crate::params::BoostParams;
use crate::tree::RegressionTree;
use crate::{BoostError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const ARTIFACT_MAGIC: &str = "tree_boost";
const FORMAT_VERSION: u32 = 1;

/// Additive ensemble of regression trees
///
/// The ensemble only ever grows: [`Booster::boost`] appends trees fitted to the
/// residual gradients of the current ensemble and never rebuilds existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booster {
    params: BoostParams,
    base_score: f64,
    feature_names: Vec<String>,
    trees: Vec<RegressionTree>,
}

/// On-disk envelope around a booster
#[derive(Serialize, Deserialize)]
struct Artifact {
    magic: String,
    version: u32,
    booster: Booster,
}

impl Booster {
    /// Create an empty ensemble that predicts `base_score` everywhere
    pub fn new(params: BoostParams, feature_names: Vec<String>, base_score: f64) -> Result<Self> {
        params.validate()?;
        if feature_names.is_empty() {
            return Err(BoostError::InvalidInput(
                "Booster needs at least one feature".to_string(),
            ));
        }
        if !base_score.is_finite() {
            return Err(BoostError::InvalidInput(
                "Base score must be finite".to_string(),
            ));
        }

        Ok(Self {
            params,
            base_score,
            feature_names,
            trees: Vec::new(),
        })
    }

    /// Train a new ensemble from scratch for `rounds` boosting rounds
    pub fn train(params: BoostParams, matrix: &FeatureMatrix, rounds: usize) -> Result<Self> {
        let labels = matrix
            .labels()
            .ok_or_else(|| BoostError::InvalidInput("Training matrix has no labels".to_string()))?;
        if labels.is_empty() {
            return Err(BoostError::InvalidInput(
                "Training matrix is empty".to_string(),
            ));
        }

        let base_score = labels.iter().sum::<f64>() / labels.len() as f64;
        let mut booster = Self::new(params, matrix.feature_names().to_vec(), base_score)?;
        booster.boost(matrix, rounds)?;
        Ok(booster)
    }

    /// Replace the hyperparameters used by subsequent rounds
    pub fn set_params(&mut self, params: BoostParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Continue training: append `rounds` trees fitted on `matrix`
    pub fn boost(&mut self, matrix: &FeatureMatrix, rounds: usize) -> Result<()> {
        self.check_features(matrix)?;
        let labels = matrix
            .labels()
            .ok_or_else(|| BoostError::InvalidInput("Training matrix has no labels".to_string()))?;
        if matrix.is_empty() {
            return Err(BoostError::InvalidInput(
                "Training matrix is empty".to_string(),
            ));
        }

        let n_rows = matrix.n_rows();
        let n_features = matrix.n_features();
        let mut margins = self.margins(matrix);
        let mut grad = vec![0.0; n_rows];
        let mut hess = vec![0.0; n_rows];

        for _ in 0..rounds {
            for i in 0..n_rows {
                let (g, h) = self.params.objective.gradient(margins[i], labels[i]);
                grad[i] = g;
                hess[i] = h;
            }

            let mut rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(self.trees.len() as u64));
            let rows = self.sample_rows(n_rows, &mut rng);
            let features = self.sample_features(n_features, &mut rng);

            let tree = RegressionTree::fit(matrix, &grad, &hess, &rows, &features, &self.params);
            for (i, margin) in margins.iter_mut().enumerate() {
                *margin += tree.predict_row(matrix.row(i));
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    /// Predict every row of `matrix`
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_features(matrix)?;
        Ok(self.margins(matrix))
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &BoostParams {
        &self.params
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Serialize to the binary artifact format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let artifact = Artifact {
            magic: ARTIFACT_MAGIC.to_string(),
            version: FORMAT_VERSION,
            booster: self.clone(),
        };
        Ok(bincode::serialize(&artifact)?)
    }

    /// Deserialize from the binary artifact format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Artifact = bincode::deserialize(bytes)
            .map_err(|e| BoostError::Incompatible(format!("unreadable artifact: {}", e)))?;

        if artifact.magic != ARTIFACT_MAGIC {
            return Err(BoostError::Incompatible(format!(
                "unexpected artifact tag '{}'",
                artifact.magic
            )));
        }
        if artifact.version != FORMAT_VERSION {
            return Err(BoostError::Incompatible(format!(
                "format version {} is not supported (expected {})",
                artifact.version, FORMAT_VERSION
            )));
        }

        artifact.booster.params.validate()?;
        Ok(artifact.booster)
    }

    /// Write the artifact to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Read an artifact from `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    fn check_features(&self, matrix: &FeatureMatrix) -> Result<()> {
        if matrix.feature_names() != self.feature_names.as_slice() {
            return Err(BoostError::FeatureMismatch {
                expected: self.feature_names.clone(),
                found: matrix.feature_names().to_vec(),
            });
        }
        Ok(())
    }

    fn margins(&self, matrix: &FeatureMatrix) -> Vec<f64> {
        (0..matrix.n_rows())
            .map(|i| {
                let row = matrix.row(i);
                self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect()
    }

    fn sample_rows(&self, n_rows: usize, rng: &mut StdRng) -> Vec<usize> {
        if self.params.subsample >= 1.0 {
            return (0..n_rows).collect();
        }

        let rows: Vec<usize> = (0..n_rows)
            .filter(|_| rng.gen::<f64>() < self.params.subsample)
            .collect();
        if rows.is_empty() {
            (0..n_rows).collect()
        } else {
            rows
        }
    }

    fn sample_features(&self, n_features: usize, rng: &mut StdRng) -> Vec<usize> {
        if self.params.colsample_bytree >= 1.0 {
            return (0..n_features).collect();
        }

        let amount = ((n_features as f64 * self.params.colsample_bytree).round() as usize).clamp(1, n_features);
        let mut features = rand::seq::index::sample(rng, n_features, amount).into_vec();
        features.sort_unstable();
        features
    }
}
