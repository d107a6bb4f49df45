mod common;

use common::{date, seasonal_sales, weekly_series};
use std::io::Write;
use store_forecast::training::{bootstrap_model, DEFAULT_BOOST_ROUNDS};
use store_forecast::{
    FeatureEngineer, FeatureFrame, ForecastError, HyperParameterRecord, IncrementalModel,
    IncrementalTrainer,
};
use tempfile::NamedTempFile;
use tree_boost::{BoostParams, Objective};

fn frame() -> FeatureFrame {
    let mut records = Vec::new();
    for store in 1..=2 {
        records.extend(weekly_series(store, date(2011, 1, 7), &seasonal_sales(store, 60)));
    }
    FeatureEngineer::new().engineer(records)
}

fn record() -> HyperParameterRecord {
    HyperParameterRecord {
        learning_rate: Some(0.1),
        max_depth: Some(3),
        n_estimators: Some(20),
        random_state: Some(7),
        ..HyperParameterRecord::default()
    }
}

#[test]
fn test_warm_start_appends_rounds() {
    let frame = frame();
    let mut model = bootstrap_model(&frame, &record(), 2012).unwrap();
    assert_eq!(model.tree_count(), 20);
    let first_tree = model.trees()[0].clone();

    let params = record().to_boost_params().unwrap();
    let summary = IncrementalTrainer::default()
        .train(&mut model, &params, &frame)
        .unwrap();

    assert_eq!(summary.trees_before, 20);
    assert_eq!(summary.trees_after, 20 + DEFAULT_BOOST_ROUNDS);
    assert_eq!(model.num_trees(), 70);
    assert_eq!(model.trees()[0], first_tree);
    assert_eq!(summary.rows, frame.usable_len());
    assert_eq!(summary.fit.rows, summary.rows);
    assert!(summary.fit.mae < 1_000.0, "{}", summary.fit);
}

#[test]
fn test_bootstrap_respects_cutoff_year() {
    let frame = frame();
    let result = bootstrap_model(&frame, &record(), 2011);
    assert!(matches!(result, Err(ForecastError::DataError(_))));
}

#[test]
fn test_hyperparameter_record_from_tuning_output() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"learning_rate": 0.05, "max_depth": 8, "subsample": 0.9, "colsample_bytree": 0.7,
            "n_estimators": 500, "objective": "reg:squaredlogerror", "n_jobs": -1,
            "random_state": 42, "reg_lambda": 2.0}}"#
    )
    .unwrap();

    let record = HyperParameterRecord::load(file.path()).unwrap();
    assert_eq!(record.n_jobs, Some(-1));
    assert_eq!(record.n_estimators, Some(500));

    let params = record.to_boost_params().unwrap();
    assert_eq!(params.objective, Objective::SquaredError);
    assert_eq!(params.learning_rate, 0.05);
    assert_eq!(params.max_depth, 8);
    assert_eq!(params.seed, 42);
    assert_eq!(params.reg_lambda, 2.0);
    assert_eq!(params.gamma, BoostParams::default().gamma);
}

#[test]
fn test_invalid_inputs() {
    assert!(matches!(
        HyperParameterRecord::load("missing_params.json"),
        Err(ForecastError::MissingInputFile { .. })
    ));

    let bad = HyperParameterRecord {
        subsample: Some(0.0),
        ..HyperParameterRecord::default()
    };
    assert!(matches!(bad.to_boost_params(), Err(ForecastError::InvalidParameter(_))));

    assert!(IncrementalTrainer::new(0).is_err());

    let empty = FeatureEngineer::new().engineer(Vec::new());
    let mut model = bootstrap_model(&frame(), &record(), 2012).unwrap();
    let params = record().to_boost_params().unwrap();
    let result = IncrementalTrainer::default().train(&mut model, &params, &empty);
    assert!(matches!(result, Err(ForecastError::DataError(_))));
}
