//! Fit accuracy and the downstream actual-vs-predicted table

use crate::error::{ForecastError, Result};
use crate::features::FeatureFrame;
use crate::persist::{commit_staged, staging_path};
use crate::utils::date_parser::format_date;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

/// In-sample error of a fitted model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitAccuracy {
    pub rows: usize,
    pub mae: f64,
    pub rmse: f64,
}

impl std::fmt::Display for FitAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rows, MAE {:.2}, RMSE {:.2}", self.rows, self.mae, self.rmse)
    }
}

/// Compare fitted values against the labels they were trained on
pub fn fit_accuracy(fitted: &[f64], labels: &[f64]) -> Result<FitAccuracy> {
    if fitted.is_empty() || fitted.len() != labels.len() {
        return Err(ForecastError::DataError(format!(
            "Cannot score {} fitted values against {} labels",
            fitted.len(),
            labels.len()
        )));
    }

    let (abs_sum, sq_sum) = fitted
        .iter()
        .zip(labels)
        .fold((0.0, 0.0), |(abs_sum, sq_sum), (y_hat, y)| {
            let residual = y - y_hat;
            (abs_sum + residual.abs(), sq_sum + residual * residual)
        });
    let n = fitted.len() as f64;

    Ok(FitAccuracy {
        rows: fitted.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
    })
}

/// One row of the table consumed by the reporting layer
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamRow {
    pub store: u32,
    pub date: NaiveDate,
    pub actual_weekly_sales: Option<f64>,
    pub predicted_weekly_sales: Option<f64>,
}

/// Map every record of a forecast frame into the downstream shape
pub fn downstream_rows(frame: &FeatureFrame) -> Vec<DownstreamRow> {
    frame
        .entries()
        .iter()
        .map(|entry| DownstreamRow {
            store: entry.record.store,
            date: entry.record.date,
            actual_weekly_sales: entry.record.weekly_sales,
            predicted_weekly_sales: entry.record.predicted_sales,
        })
        .collect()
}

/// Downstream table as a DataFrame with columns
/// `Store, Date, actual_weekly_sales, predicted_weekly_sales`
pub fn downstream_frame(rows: &[DownstreamRow]) -> Result<DataFrame> {
    let stores: Vec<u32> = rows.iter().map(|r| r.store).collect();
    let dates: Vec<String> = rows.iter().map(|r| format_date(r.date)).collect();
    let actual: Vec<Option<f64>> = rows.iter().map(|r| r.actual_weekly_sales).collect();
    let predicted: Vec<Option<f64>> = rows.iter().map(|r| r.predicted_weekly_sales).collect();

    let df = DataFrame::new(vec![
        Series::new("Store", stores),
        Series::new("Date", dates),
        Series::new("actual_weekly_sales", actual),
        Series::new("predicted_weekly_sales", predicted),
    ])?;

    Ok(df)
}

/// Write the downstream table as CSV, replacing `path` only once fully written
pub fn write_downstream_csv<P: AsRef<Path>>(rows: &[DownstreamRow], path: P) -> Result<()> {
    let path = path.as_ref();
    let staging = staging_path(path);
    stage_downstream_csv(rows, &staging)?;
    commit_staged(&staging, path)
}

/// Write the table to `staging` and check it reads back with every row
pub(crate) fn stage_downstream_csv(rows: &[DownstreamRow], staging: &Path) -> Result<()> {
    let mut df = downstream_frame(rows)?;

    let written = File::create(staging)
        .map_err(ForecastError::from)
        .and_then(|mut file| {
            CsvWriter::new(&mut file)
                .has_header(true)
                .finish(&mut df)
                .map_err(ForecastError::from)
        })
        .and_then(|_| {
            let written_rows = csv::Reader::from_path(staging)?.records().count();
            if written_rows == rows.len() {
                Ok(())
            } else {
                Err(ForecastError::DataError(format!(
                    "Staged downstream table has {} rows, expected {}",
                    written_rows,
                    rows.len()
                )))
            }
        });

    if let Err(e) = written {
        let _ = fs::remove_file(staging);
        return Err(e);
    }
    Ok(())
}
