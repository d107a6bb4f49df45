mod common;

use chrono::Duration;
use common::{csv_line, date, seasonal_sales, weekly_series, HEADER};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use store_forecast::persist::master_columns;
use store_forecast::pipeline::bootstrap_initial_model;
use store_forecast::{run_monthly_update, DataLoader, ForecastError, PipelineConfig, SalesRecord};
use tempfile::TempDir;
use tree_boost::Booster;

const STORES: [u32; 3] = [1, 2, 3];

fn weeks(store: u32, from: usize, to: usize) -> Vec<SalesRecord> {
    let sales = seasonal_sales(store, to);
    let start = date(2010, 2, 5) + Duration::weeks(from as i64);
    weekly_series(store, start, &sales[from..to])
}

fn write_table(path: &Path, records: &[SalesRecord]) {
    let mut lines = vec![HEADER.to_string()];
    lines.extend(records.iter().map(csv_line));
    fs::write(path, lines.join("\n") + "\n").unwrap();
}

fn batch(from: usize, to: usize) -> Vec<SalesRecord> {
    STORES.iter().flat_map(|&s| weeks(s, from, to)).collect()
}

fn setup() -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("Data");
    fs::create_dir_all(&data_dir).unwrap();

    let config = PipelineConfig {
        monthly_batch_path: data_dir.join("monthly_data.csv"),
        master_path: data_dir.join("base_data.csv"),
        model_path: dir.path().join("best_xgb_model_init.bin"),
        params_path: dir.path().join("best_xgb_params.json"),
        output_dir: data_dir.clone(),
        horizon_months: 2,
        boost_rounds: 10,
        weeks_per_month: 4,
        downstream_path: Some(data_dir.join("predictions.csv")),
    };

    let mut master = batch(0, 100);
    // Only two weeks of history: never usable
    master.extend(weekly_series(4, date(2011, 6, 3), &[5_000.0, 5_100.0]));
    write_table(&config.master_path, &master);
    write_table(&config.monthly_batch_path, &batch(100, 104));
    fs::write(
        &config.params_path,
        r#"{"learning_rate": 0.2, "max_depth": 3, "n_estimators": 10, "random_state": 1, "n_jobs": 4}"#,
    )
    .unwrap();

    (dir, config)
}

#[test]
fn test_full_monthly_cycle() {
    let (_dir, config) = setup();

    let bootstrap = bootstrap_initial_model(&config, 2012).unwrap();
    assert_eq!(bootstrap.trees, 10);
    assert_eq!(bootstrap.excluded_stores, vec![4]);

    let report = run_monthly_update(config.clone()).unwrap();

    assert_eq!(report.batch_period, (2012, 1));
    assert_eq!(report.merged_rows, 302 + 12);
    assert_eq!(report.superseded_forecasts, 0);
    assert_eq!(report.duplicate_keys, 0);
    assert_eq!(report.excluded_stores, vec![4]);
    assert_eq!(report.training.trees_before, 10);
    assert_eq!(report.training.trees_after, 20);
    assert_eq!(report.future_rows, 2 * 4 * 3);
    assert_eq!(report.predicted_rows, 24);
    assert_eq!(report.unresolved_rows, 0);

    let model_path = config.output_dir.join("xgb_model_2012_01.bin");
    assert_eq!(report.artifacts.model_path, model_path);
    assert_eq!(Booster::load(&model_path).unwrap().num_trees(), 20);
    assert!(!config.output_dir.join("xgb_model_2012_01.bin.tmp").exists());
    assert!(!config.output_dir.join("base_data.csv.tmp").exists());

    // The persisted master reloads with the same rows and schema
    let master = DataLoader::from_csv(&config.master_path).unwrap();
    assert_eq!(master.len(), 314 + 24);
    assert_eq!(master.columns(), master_columns().as_slice());
    let forecasts: Vec<_> = master.records().iter().filter(|r| !r.is_labeled()).collect();
    assert_eq!(forecasts.len(), 24);
    assert!(forecasts.iter().all(|r| r.predicted_sales.is_some()));
    assert!(master
        .records()
        .iter()
        .filter(|r| r.is_labeled())
        .all(|r| r.predicted_sales.is_none()));

    let downstream = fs::read_to_string(config.downstream_path.as_ref().unwrap()).unwrap();
    assert_eq!(downstream.lines().count(), 338 + 1);
}

#[test]
fn test_next_cycle_replaces_previous_forecasts() {
    let (_dir, mut config) = setup();
    bootstrap_initial_model(&config, 2012).unwrap();
    let first = run_monthly_update(config.clone()).unwrap();

    write_table(&config.monthly_batch_path, &batch(104, 108));
    config.model_path = first.artifacts.model_path.clone();
    let second = run_monthly_update(config.clone()).unwrap();

    assert_eq!(second.superseded_forecasts, 24);
    assert_eq!(second.merged_rows, 314 + 12);
    assert_eq!(second.training.trees_before, 20);
    assert_eq!(second.training.trees_after, 30);
    assert_eq!(second.batch_period, (2012, 2));

    let master = DataLoader::from_csv(&config.master_path).unwrap();
    assert_eq!(master.len(), 326 + 24);
    assert_eq!(master.columns(), master_columns().as_slice());
}

#[test]
fn test_failures_leave_master_untouched() {
    let (_dir, mut config) = setup();
    let before = fs::read_to_string(&config.master_path).unwrap();

    // No model yet
    let result = run_monthly_update(config.clone());
    assert!(matches!(result, Err(ForecastError::MissingInputFile { .. })));

    fs::write(&config.model_path, b"not a model").unwrap();
    let result = run_monthly_update(config.clone());
    assert!(matches!(result, Err(ForecastError::ModelLoadFailure { .. })));

    bootstrap_initial_model(&config, 2012).unwrap();
    fs::write(&config.monthly_batch_path, "Store,Date,Weekly_Sales\n1,2012-01-13,5.0\n").unwrap();
    let result = run_monthly_update(config.clone());
    assert!(matches!(result, Err(ForecastError::SchemaMismatch { .. })));

    config.params_path = config.output_dir.join("missing.json");
    assert!(run_monthly_update(config.clone()).is_err());

    assert_eq!(fs::read_to_string(&config.master_path).unwrap(), before);
    assert!(!config.output_dir.join("xgb_model_2012_01.bin").exists());
}

#[test]
fn test_failed_downstream_write_commits_nothing() {
    let (dir, mut config) = setup();
    bootstrap_initial_model(&config, 2012).unwrap();
    let before = fs::read(&config.master_path).unwrap();

    let target = config.downstream_path.clone();
    config.downstream_path = Some(dir.path().join("missing").join("predictions.csv"));
    assert!(run_monthly_update(config.clone()).is_err());

    assert_eq!(fs::read(&config.master_path).unwrap(), before);
    assert!(!config.output_dir.join("xgb_model_2012_01.bin").exists());
    assert!(!config.output_dir.join("xgb_model_2012_01.bin.tmp").exists());
    assert!(!config.output_dir.join("base_data.csv.tmp").exists());

    // Retrying merges the batch exactly once
    config.downstream_path = target;
    run_monthly_update(config.clone()).unwrap();
    let master = DataLoader::from_csv(&config.master_path).unwrap();
    assert_eq!(master.len(), 338);
    assert_eq!(master.records().iter().filter(|r| r.is_labeled()).count(), 314);
    assert!(!config.output_dir.join("base_data.csv.bak").exists());
}
