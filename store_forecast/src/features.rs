//! Causal feature engineering over per-store sales histories
//!
//! Records are ordered by (store, date) and walked one store at a time with a
//! [`TrailingWindow`]. Lag, rolling and percent-change statistics for a row are
//! read from the window *before* that row's own value is pushed, so a row's
//! features only ever depend on earlier rows of the same store.

use crate::data::SalesRecord;
use crate::error::Result;
use crate::utils::{iso_week, quarter};
use crate::window::TrailingWindow;
use chrono::{Datelike, NaiveDate};
use statrs::statistics::Statistics;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use tree_boost::FeatureMatrix;

/// Lags of the sales series attached to each row
pub const LAGS: [usize; 3] = [1, 2, 3];

/// Rolling window sizes over the shifted sales series
pub const ROLLING_WINDOWS: [usize; 2] = [2, 3];

/// Period of the percent change, measured on the shifted series
pub const PCT_CHANGE_PERIOD: usize = 1;

/// Prior rows a store needs before its first row gets complete features
pub const MIN_HISTORY: usize = 3;

const WINDOW_CAPACITY: NonZeroUsize = match NonZeroUsize::new(MIN_HISTORY) {
    Some(capacity) => capacity,
    None => panic!("MIN_HISTORY must be non-zero"),
};

/// Model input columns, in matrix order
pub const FEATURE_NAMES: [&str; 18] = [
    "Holiday_Flag",
    "Temperature",
    "Fuel_Price",
    "CPI",
    "Unemployment",
    "Year",
    "Month",
    "Week",
    "Quarter",
    "Sales_lag_1",
    "Sales_lag_2",
    "Sales_lag_3",
    "Sales_roll_2_mean",
    "Sales_roll_2_std",
    "Sales_roll_3_mean",
    "Sales_roll_3_std",
    "Sales_pct_change_1",
    "Store",
];

/// Derived columns written to the master dataset, in column order
pub const DERIVED_COLUMNS: [&str; 12] = [
    "Year",
    "Month",
    "Week",
    "Quarter",
    "Sales_lag_1",
    "Sales_lag_2",
    "Sales_lag_3",
    "Sales_roll_2_mean",
    "Sales_roll_2_std",
    "Sales_roll_3_mean",
    "Sales_roll_3_std",
    "Sales_pct_change_1",
];

/// Fields derived from the row's own date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    pub week: u32,
    pub quarter: u32,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            week: iso_week(date),
            quarter: quarter(date),
        }
    }
}

/// Statistics computed strictly from earlier rows of the same store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CausalFeatures {
    /// `Sales_lag_k` for each k in [`LAGS`]
    pub lags: [f64; 3],
    /// `Sales_roll_w_mean` for each w in [`ROLLING_WINDOWS`]
    pub rolling_mean: [f64; 2],
    /// `Sales_roll_w_std` (sample std) for each w in [`ROLLING_WINDOWS`]
    pub rolling_std: [f64; 2],
    /// `Sales_pct_change_1`
    pub pct_change: f64,
}

impl CausalFeatures {
    /// Read the statistics from a window holding only prior values
    pub fn from_window(window: &TrailingWindow) -> Option<Self> {
        let mut lags = [0.0; 3];
        for (slot, &k) in lags.iter_mut().zip(LAGS.iter()) {
            *slot = window.lag(k)?;
        }

        let mut rolling_mean = [0.0; 2];
        let mut rolling_std = [0.0; 2];
        for (i, &w) in ROLLING_WINDOWS.iter().enumerate() {
            let values = window.recent(w)?;
            rolling_mean[i] = values.iter().mean();
            rolling_std[i] = values.iter().std_dev();
        }

        let latest = window.lag(1)?;
        let base = window.lag(1 + PCT_CHANGE_PERIOD)?;
        // A zero base has no relative change; 0.0 keeps the row usable
        let pct_change = if base == 0.0 {
            0.0
        } else {
            (latest - base) / base
        };

        let features = Self {
            lags,
            rolling_mean,
            rolling_std,
            pct_change,
        };
        features.is_finite().then_some(features)
    }

    fn is_finite(&self) -> bool {
        self.lags
            .iter()
            .chain(self.rolling_mean.iter())
            .chain(self.rolling_std.iter())
            .chain(std::iter::once(&self.pct_change))
            .all(|v| v.is_finite())
    }

    /// Lag `k` (1-based)
    pub fn sales_lag(&self, k: usize) -> Option<f64> {
        LAGS.iter().position(|&l| l == k).map(|i| self.lags[i])
    }
}

/// Complete model input for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub calendar: CalendarFeatures,
    pub causal: CausalFeatures,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order
    pub fn to_row(&self, record: &SalesRecord) -> Vec<f64> {
        let c = &self.causal;
        vec![
            if record.holiday_flag { 1.0 } else { 0.0 },
            record.temperature,
            record.fuel_price,
            record.cpi,
            record.unemployment,
            self.calendar.year as f64,
            self.calendar.month as f64,
            self.calendar.week as f64,
            self.calendar.quarter as f64,
            c.lags[0],
            c.lags[1],
            c.lags[2],
            c.rolling_mean[0],
            c.rolling_std[0],
            c.rolling_mean[1],
            c.rolling_std[1],
            c.pct_change,
            record.store as f64,
        ]
    }
}

/// A record together with whatever features could be derived for it
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    pub record: SalesRecord,
    pub calendar: CalendarFeatures,
    pub causal: Option<CausalFeatures>,
}

impl FrameEntry {
    /// Full feature vector, if every causal statistic is defined
    pub fn features(&self) -> Option<FeatureVector> {
        self.causal.map(|causal| FeatureVector {
            calendar: self.calendar,
            causal,
        })
    }
}

/// Records ordered by (store, date) with their derived features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    entries: Vec<FrameEntry>,
    excluded_stores: Vec<u32>,
}

impl FeatureFrame {
    /// Every record, including those whose features are undefined
    pub fn entries(&self) -> &[FrameEntry] {
        &self.entries
    }

    pub fn into_records(self) -> Vec<SalesRecord> {
        self.entries.into_iter().map(|e| e.record).collect()
    }

    /// Rows with complete features; the usable output of feature engineering
    pub fn rows(&self) -> impl Iterator<Item = (&SalesRecord, FeatureVector)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.features().map(|f| (&e.record, f)))
    }

    /// Number of rows with complete features
    pub fn usable_len(&self) -> usize {
        self.entries.iter().filter(|e| e.causal.is_some()).count()
    }

    /// Number of records, usable or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores that produced no usable row because their history is too short
    pub fn excluded_stores(&self) -> &[u32] {
        &self.excluded_stores
    }

    /// Latest date across all records
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.entries.iter().map(|e| e.record.date).max()
    }

    /// Latest date of an observed row
    pub fn latest_labeled_date(&self) -> Option<NaiveDate> {
        self.entries
            .iter()
            .filter(|e| e.record.is_labeled())
            .map(|e| e.record.date)
            .max()
    }

    /// Set the forecast of the entry at `index`
    pub(crate) fn set_prediction(&mut self, index: usize, value: f64) {
        self.entries[index].record.predicted_sales = Some(value);
    }

    /// Labeled rows with complete features as a training matrix
    pub fn training_matrix(&self) -> Result<FeatureMatrix> {
        self.training_matrix_where(|_| true)
    }

    /// Training matrix restricted to the labeled rows accepted by `keep`
    pub fn training_matrix_where<F>(&self, keep: F) -> Result<FeatureMatrix>
    where
        F: Fn(&SalesRecord) -> bool,
    {
        let (rows, labels): (Vec<Vec<f64>>, Vec<f64>) = self
            .rows()
            .filter(|(record, _)| keep(*record))
            .filter_map(|(record, features)| {
                record
                    .weekly_sales
                    .map(|label| (features.to_row(record), label))
            })
            .unzip();

        Ok(FeatureMatrix::new(FeatureEngineer::feature_names(), rows)?.with_labels(labels)?)
    }

    /// Matrix over the entries at `indices`; each must have complete features
    pub(crate) fn matrix_for(&self, indices: &[usize]) -> Result<FeatureMatrix> {
        let rows = indices
            .iter()
            .filter_map(|&i| {
                let entry = &self.entries[i];
                entry.features().map(|f| f.to_row(&entry.record))
            })
            .collect();

        Ok(FeatureMatrix::new(FeatureEngineer::feature_names(), rows)?)
    }
}

/// Builds causal feature frames from raw sales records
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// Model input column names
    pub fn feature_names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
    }

    /// Derived column names written alongside the raw columns
    pub fn derived_columns() -> Vec<String> {
        DERIVED_COLUMNS.iter().map(|n| n.to_string()).collect()
    }

    /// Order records by (store, date) and derive their features
    ///
    /// Ordering is stable, so duplicate (store, date) rows keep their input
    /// order. The output is fully determined by the input.
    pub fn engineer(&self, mut records: Vec<SalesRecord>) -> FeatureFrame {
        records.sort_by(|a, b| a.store.cmp(&b.store).then(a.date.cmp(&b.date)));

        let mut window = TrailingWindow::with_capacity(WINDOW_CAPACITY);
        let mut entries = Vec::with_capacity(records.len());
        let mut current_store = None;

        for record in records {
            if current_store != Some(record.store) {
                window.reset();
                current_store = Some(record.store);
            }

            let causal = CausalFeatures::from_window(&window);
            window.push(record.series_value());

            entries.push(FrameEntry {
                calendar: CalendarFeatures::from_date(record.date),
                causal,
                record,
            });
        }

        let all_stores: BTreeSet<u32> = entries.iter().map(|e| e.record.store).collect();
        let usable_stores: BTreeSet<u32> = entries
            .iter()
            .filter(|e| e.causal.is_some())
            .map(|e| e.record.store)
            .collect();
        let excluded_stores = all_stores.difference(&usable_stores).copied().collect();

        FeatureFrame {
            entries,
            excluded_stores,
        }
    }
}
