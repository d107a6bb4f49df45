#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::io::Write;
use store_forecast::SalesRecord;
use tempfile::NamedTempFile;

pub const HEADER: &str =
    "Store,Date,Weekly_Sales,Holiday_Flag,Temperature,Fuel_Price,CPI,Unemployment";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn record(store: u32, date: NaiveDate, sales: Option<f64>) -> SalesRecord {
    SalesRecord {
        store,
        date,
        weekly_sales: sales,
        holiday_flag: false,
        temperature: 42.0,
        fuel_price: 2.6,
        cpi: 211.0,
        unemployment: 8.1,
        predicted_sales: None,
    }
}

/// Weekly records for one store starting at `start`
pub fn weekly_series(store: u32, start: NaiveDate, sales: &[f64]) -> Vec<SalesRecord> {
    sales
        .iter()
        .enumerate()
        .map(|(i, &s)| record(store, start + Duration::weeks(i as i64), Some(s)))
        .collect()
}

/// Smooth seasonal sales used by training and pipeline tests
pub fn seasonal_sales(store: u32, weeks: usize) -> Vec<f64> {
    (0..weeks)
        .map(|w| {
            let season = (w as f64 / 52.0 * std::f64::consts::TAU).sin();
            10_000.0 + 1_000.0 * store as f64 + 800.0 * season + (w % 4) as f64 * 50.0
        })
        .collect()
}

pub fn csv_line(r: &SalesRecord) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        r.store,
        r.date.format("%Y-%m-%d"),
        r.weekly_sales.map(|v| v.to_string()).unwrap_or_default(),
        u8::from(r.holiday_flag),
        r.temperature,
        r.fuel_price,
        r.cpi,
        r.unemployment
    )
}

pub fn write_csv(records: &[SalesRecord]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for r in records {
        writeln!(file, "{}", csv_line(r)).unwrap();
    }
    file.flush().unwrap();
    file
}
