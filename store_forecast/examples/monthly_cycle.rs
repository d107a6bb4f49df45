use chrono::{Duration, NaiveDate};
use std::fs;
use std::path::Path;
use store_forecast::pipeline::bootstrap_initial_model;
use store_forecast::{run_monthly_update, PipelineConfig};

const HEADER: &str = "Store,Date,Weekly_Sales,Holiday_Flag,Temperature,Fuel_Price,CPI,Unemployment";

// Seasonal weekly sales with a per-store level
fn weekly_sales(store: u32, week: i64) -> f64 {
    let season = (week as f64 / 52.0 * std::f64::consts::TAU).sin();
    20_000.0 + 1_500.0 * store as f64 + 2_000.0 * season + (week % 5) as f64 * 150.0
}

fn write_table(path: &Path, stores: &[u32], start: NaiveDate, weeks: std::ops::Range<i64>) -> std::io::Result<()> {
    let mut lines = vec![HEADER.to_string()];
    for week in weeks {
        let date = start + Duration::weeks(week);
        for &store in stores {
            lines.push(format!(
                "{},{},{:.2},{},{:.1},{:.3},{:.3},{:.2}",
                store,
                date.format("%d-%m-%Y"),
                weekly_sales(store, week),
                u8::from(week % 13 == 0),
                50.0 + 20.0 * (week as f64 / 8.0).sin(),
                3.2 + week as f64 * 0.002,
                211.0 + week as f64 * 0.05,
                7.8,
            ));
        }
    }
    fs::write(path, lines.join("\n") + "\n")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let data_dir = dir.path().join("Data");
    fs::create_dir_all(&data_dir)?;

    // Two years of history for three stores, then one month of new actuals
    let start = NaiveDate::from_ymd_opt(2010, 2, 5).ok_or("invalid start date")?;
    let stores = [1, 2, 3];
    let config = PipelineConfig {
        monthly_batch_path: data_dir.join("monthly_data.csv"),
        master_path: data_dir.join("base_data.csv"),
        model_path: dir.path().join("best_xgb_model_init.bin"),
        params_path: dir.path().join("best_xgb_params.json"),
        output_dir: data_dir.clone(),
        horizon_months: 3,
        downstream_path: Some(data_dir.join("predictions.csv")),
        ..PipelineConfig::default()
    };

    write_table(&config.master_path, &stores, start, 0..104)?;
    write_table(&config.monthly_batch_path, &stores, start, 104..108)?;
    fs::write(
        &config.params_path,
        r#"{"learning_rate": 0.1, "max_depth": 4, "subsample": 0.8, "n_estimators": 60, "random_state": 42}"#,
    )?;

    println!("Bootstrapping initial model...");
    let bootstrap = bootstrap_initial_model(&config, 2012)?;
    println!("Initial model has {} trees", bootstrap.trees);

    println!("Running monthly update...");
    let report = run_monthly_update(config.clone())?;
    println!("{}", report);

    let preview = fs::read_to_string(data_dir.join("predictions.csv"))?;
    println!("Last forecast rows:");
    for line in preview.lines().rev().take(5) {
        println!("  {}", line);
    }

    Ok(())
}
