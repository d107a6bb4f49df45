//! # Store Forecast
//!
//! Weekly per-store retail sales forecasting with incremental monthly retraining.
//!
//! ## Features
//!
//! - Causal feature engineering (calendar fields, lags, rolling statistics, percent change)
//! - Merging of the master dataset with monthly batches of new actuals
//! - Warm-start training of a boosted tree ensemble on newly labeled rows
//! - Future skeleton generation and recursive multi-week prediction
//! - Atomic persistence of the master dataset and versioned model artifacts
//!
//! ## Quick Start
//!
//! ```no_run
//! use store_forecast::{run_monthly_update, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let report = run_monthly_update(config)?;
//! println!("{}", report);
//! # Ok::<(), store_forecast::ForecastError>(())
//! ```
//!
//! The stages can also be driven one by one:
//!
//! ```no_run
//! use store_forecast::{DataLoader, FeatureEngineer, FutureSkeletonGenerator};
//!
//! let master = DataLoader::from_csv("Data/base_data.csv")?;
//! let frame = FeatureEngineer::new().engineer(master.into_records());
//! let skeleton = FutureSkeletonGenerator::default().generate(&frame);
//! println!("{} usable rows, {} future rows", frame.usable_len(), skeleton.len());
//! # Ok::<(), store_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod merge;
pub mod metrics;
pub mod models;
pub mod persist;
pub mod pipeline;
pub mod predict;
pub mod skeleton;
pub mod training;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{DataLoader, ForecastDataset, SalesRecord};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{FeatureEngineer, FeatureFrame, FeatureVector};
pub use crate::merge::{DatasetMerger, MergeOutcome};
pub use crate::metrics::{fit_accuracy, FitAccuracy};
pub use crate::models::{IncrementalModel, SalesModel};
pub use crate::persist::ArtifactPersister;
pub use crate::pipeline::{run_monthly_update, MonthlyPipeline, PipelineContext, PipelineReport};
pub use crate::predict::{ForecastOutcome, ForecastPredictor};
pub use crate::skeleton::{FutureSkeletonGenerator, Skeleton};
pub use crate::training::{HyperParameterRecord, IncrementalTrainer, TrainingSummary};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
