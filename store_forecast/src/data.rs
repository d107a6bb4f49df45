//! Sales records and tabular loading

use crate::error::{ForecastError, Result};
use crate::utils::date_parser;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns every master dataset and monthly batch must carry
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "Store",
    "Date",
    "Weekly_Sales",
    "Holiday_Flag",
    "Temperature",
    "Fuel_Price",
    "CPI",
    "Unemployment",
];

/// Column holding forecasts, distinct from the observed label
pub const PREDICTED_COLUMN: &str = "Predicted_Sales";

/// One week of sales for one store
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    /// Store identifier
    pub store: u32,
    /// Week date
    pub date: NaiveDate,
    /// Observed sales; `None` marks an unlabeled (future) row
    pub weekly_sales: Option<f64>,
    /// Whether the week contains a holiday
    pub holiday_flag: bool,
    /// Average temperature
    pub temperature: f64,
    /// Fuel price
    pub fuel_price: f64,
    /// Consumer price index
    pub cpi: f64,
    /// Unemployment rate
    pub unemployment: f64,
    /// Model forecast for unlabeled rows
    pub predicted_sales: Option<f64>,
}

impl SalesRecord {
    /// Whether the row carries an observed label
    pub fn is_labeled(&self) -> bool {
        self.weekly_sales.is_some()
    }

    /// Value fed to lag and rolling statistics: the observation, else the forecast
    pub fn series_value(&self) -> Option<f64> {
        self.weekly_sales.or(self.predicted_sales)
    }

    /// (year, month) of the record's date
    pub fn period(&self) -> (i32, u32) {
        (self.date.year(), self.date.month())
    }
}

/// A CSV row before validation
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Store")]
    store: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Weekly_Sales")]
    weekly_sales: Option<f64>,
    #[serde(rename = "Holiday_Flag")]
    holiday_flag: String,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Fuel_Price")]
    fuel_price: f64,
    #[serde(rename = "CPI")]
    cpi: f64,
    #[serde(rename = "Unemployment")]
    unemployment: f64,
    #[serde(rename = "Predicted_Sales", default)]
    predicted_sales: Option<f64>,
}

impl RawRecord {
    fn into_record(self, line: u64) -> Result<SalesRecord> {
        let store = parse_store(&self.store).ok_or_else(|| {
            ForecastError::DataError(format!("Line {}: invalid Store '{}'", line, self.store))
        })?;
        let date = date_parser::parse_date(&self.date)
            .map_err(|e| ForecastError::DataError(format!("Line {}: {}", line, e)))?;
        let holiday_flag = parse_flag(&self.holiday_flag).ok_or_else(|| {
            ForecastError::DataError(format!(
                "Line {}: invalid Holiday_Flag '{}'",
                line, self.holiday_flag
            ))
        })?;

        Ok(SalesRecord {
            store,
            date,
            weekly_sales: self.weekly_sales.filter(|v| v.is_finite()),
            holiday_flag,
            temperature: self.temperature,
            fuel_price: self.fuel_price,
            cpi: self.cpi,
            unemployment: self.unemployment,
            predicted_sales: self.predicted_sales.filter(|v| v.is_finite()),
        })
    }
}

fn parse_store(value: &str) -> Option<u32> {
    let value = value.trim();
    value.parse::<u32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32)
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        other => other.parse::<f64>().ok().map(|v| v != 0.0),
    }
}

/// Ordered collection of sales records together with the columns they were read from
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDataset {
    records: Vec<SalesRecord>,
    columns: Vec<String>,
}

impl ForecastDataset {
    /// Wrap in-memory records; the dataset carries the full required schema
    pub fn new(records: Vec<SalesRecord>) -> Self {
        let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.push(PREDICTED_COLUMN.to_string());
        Self { records, columns }
    }

    /// Wrap records read from a table with the given header
    pub fn with_columns(records: Vec<SalesRecord>, columns: Vec<String>) -> Self {
        Self { records, columns }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SalesRecord> {
        self.records
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Required columns absent from this dataset's header
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|required| !self.columns.iter().any(|c| c == *required))
            .map(|c| c.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of rows carrying an observed label
    pub fn labeled_len(&self) -> usize {
        self.records.iter().filter(|r| r.is_labeled()).count()
    }

    /// Distinct store ids, ascending
    pub fn stores(&self) -> Vec<u32> {
        self.records
            .iter()
            .map(|r| r.store)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Latest date across all rows
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// (year, month) of the first row, which names the batch's model artifact
    pub fn batch_period(&self) -> Option<(i32, u32)> {
        self.records.first().map(SalesRecord::period)
    }
}

impl Default for ForecastDataset {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Data loader for sales tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a sales table from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<ForecastDataset> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForecastError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Load a sales table from any reader; `source_name` labels errors
    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<ForecastDataset> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !columns.iter().any(|c| c == *required))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::SchemaMismatch {
                source_name: source_name.to_string(),
                missing,
            });
        }

        let mut records = Vec::new();
        for (i, row) in csv_reader.deserialize::<RawRecord>().enumerate() {
            // Header is line 1
            let line = i as u64 + 2;
            let raw = row.map_err(|e| {
                ForecastError::DataError(format!("{} line {}: {}", source_name, line, e))
            })?;
            records.push(raw.into_record(line)?);
        }

        Ok(ForecastDataset::with_columns(records, columns))
    }
}
