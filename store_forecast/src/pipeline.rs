//! The monthly update: merge, engineer, train, forecast, persist
//!
//! All state a run needs lives in a [`PipelineContext`] that is passed through
//! the stages. The run is a single forward path; any error aborts it before
//! anything is written.

use crate::config::PipelineConfig;
use crate::data::DataLoader;
use crate::error::{ForecastError, Result};
use crate::features::FeatureEngineer;
use crate::merge::DatasetMerger;
use crate::models::gradient_boosting::load_booster;
use crate::persist::{commit_staged, staging_path, ArtifactPersister, PersistedArtifacts};
use crate::predict::ForecastPredictor;
use crate::skeleton::FutureSkeletonGenerator;
use crate::training::{bootstrap_model, HyperParameterRecord, IncrementalTrainer, TrainingSummary};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tree_boost::{BoostParams, Booster};

/// Configuration plus the loaded model and its frozen hyperparameters
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub model: Booster,
    pub params: BoostParams,
}

impl PipelineContext {
    /// Load the model and hyperparameter artifacts named by `config`
    pub fn load(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let record = HyperParameterRecord::load(&config.params_path)?;
        let params = record.to_boost_params()?;
        let model = load_booster(&config.model_path)?;
        info!(
            model = %config.model_path.display(),
            trees = model.num_trees(),
            "Loaded model"
        );

        Ok(Self {
            config,
            model,
            params,
        })
    }
}

/// Summary of a completed monthly run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// (year, month) of the batch, which names the model artifact
    pub batch_period: (i32, u32),
    pub merged_rows: usize,
    pub superseded_forecasts: usize,
    pub duplicate_keys: usize,
    /// Rows with complete features after merging
    pub usable_rows: usize,
    /// Stores dropped for insufficient history
    pub excluded_stores: Vec<u32>,
    pub training: TrainingSummary,
    pub future_rows: usize,
    pub predicted_rows: usize,
    pub unresolved_rows: usize,
    pub artifacts: PersistedArtifacts,
    pub downstream_path: Option<PathBuf>,
}

impl std::fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Monthly update {}-{:02}:",
            self.batch_period.0, self.batch_period.1
        )?;
        writeln!(f, "  Merged rows:     {}", self.merged_rows)?;
        writeln!(f, "  Usable rows:     {}", self.usable_rows)?;
        writeln!(f, "  Excluded stores: {:?}", self.excluded_stores)?;
        writeln!(
            f,
            "  Trees:           {} -> {}",
            self.training.trees_before, self.training.trees_after
        )?;
        writeln!(f, "  Training fit:    {}", self.training.fit)?;
        writeln!(
            f,
            "  Forecast rows:   {} ({} unresolved)",
            self.predicted_rows, self.unresolved_rows
        )?;
        writeln!(f, "  Model artifact:  {}", self.artifacts.model_path.display())?;
        Ok(())
    }
}

/// One monthly cycle over a loaded context
#[derive(Debug)]
pub struct MonthlyPipeline {
    context: PipelineContext,
}

impl MonthlyPipeline {
    pub fn new(context: PipelineContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Run every stage and persist the results
    pub fn run(self) -> Result<PipelineReport> {
        let PipelineContext {
            config,
            mut model,
            params,
        } = self.context;

        let master = DataLoader::from_csv(&config.master_path)?;
        let batch = DataLoader::from_csv(&config.monthly_batch_path)?;
        let batch_period = batch
            .batch_period()
            .ok_or_else(|| ForecastError::DataError("Monthly batch is empty".to_string()))?;
        info!(
            master_rows = master.len(),
            batch_rows = batch.len(),
            "Loaded inputs"
        );

        let merged = DatasetMerger::new().merge(master, batch)?;
        let merged_rows = merged.dataset.len();

        let engineer = FeatureEngineer::new();
        let frame = engineer.engineer(merged.dataset.into_records());
        let usable_rows = frame.usable_len();
        let excluded_stores = frame.excluded_stores().to_vec();
        if !excluded_stores.is_empty() {
            warn!(
                stores = ?excluded_stores,
                "Stores excluded for insufficient history"
            );
        }
        info!(rows = frame.len(), usable_rows, "Engineered features");

        let trainer = IncrementalTrainer::new(config.boost_rounds)?;
        let training = trainer.train(&mut model, &params, &frame)?;

        let generator = FutureSkeletonGenerator::new(config.horizon_months, config.weeks_per_month)?;
        let skeleton = generator.generate(&frame);
        let future_rows = skeleton.len();

        let outcome = ForecastPredictor::new(&model).predict(frame.into_records(), skeleton.records)?;

        let persister = ArtifactPersister::new(&config.output_dir)
            .with_downstream_path(config.downstream_path.clone());
        let artifacts = persister.persist(&outcome.frame, &config.master_path, &model, batch_period)?;

        Ok(PipelineReport {
            batch_period,
            merged_rows,
            superseded_forecasts: merged.superseded_forecasts,
            duplicate_keys: merged.duplicate_keys,
            usable_rows,
            excluded_stores,
            training,
            future_rows,
            predicted_rows: outcome.predicted_rows,
            unresolved_rows: outcome.unresolved_rows,
            artifacts,
            downstream_path: config.downstream_path.clone(),
        })
    }
}

/// Load the artifacts named by `config` and run one monthly cycle
pub fn run_monthly_update(config: PipelineConfig) -> Result<PipelineReport> {
    let context = PipelineContext::load(config)?;
    MonthlyPipeline::new(context).run()
}

/// Summary of a bootstrap run
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    pub model_path: PathBuf,
    pub trees: usize,
    pub excluded_stores: Vec<u32>,
}

/// Train the initial model from the master dataset and write it to `model_path`
pub fn bootstrap_initial_model(config: &PipelineConfig, cutoff_year: i32) -> Result<BootstrapReport> {
    let record = HyperParameterRecord::load(&config.params_path)?;
    let master = DataLoader::from_csv(&config.master_path)?;
    let frame = FeatureEngineer::new().engineer(master.into_records());
    if !frame.excluded_stores().is_empty() {
        warn!(
            stores = ?frame.excluded_stores(),
            "Stores excluded for insufficient history"
        );
    }

    let model = bootstrap_model(&frame, &record, cutoff_year)?;

    let target = &config.model_path;
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(target);
    if let Err(e) = model.save(&staging) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    commit_staged(&staging, target)?;
    info!(model = %target.display(), trees = model.num_trees(), "Wrote initial model");

    Ok(BootstrapReport {
        model_path: target.clone(),
        trees: model.num_trees(),
        excluded_stores: frame.excluded_stores().to_vec(),
    })
}
