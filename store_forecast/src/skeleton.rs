//! Synthetic future rows used as prediction targets

use crate::data::SalesRecord;
use crate::error::{ForecastError, Result};
use crate::features::FeatureFrame;
use crate::utils::future_weekly_dates;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::info;

/// Default forecast horizon in months
pub const DEFAULT_HORIZON_MONTHS: usize = 24;

/// Weeks generated per horizon month; a fixed approximation of a calendar month
pub const DEFAULT_WEEKS_PER_MONTH: usize = 4;

/// Future rows for every store, ordered by date then store
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub records: Vec<SalesRecord>,
    pub dates: Vec<NaiveDate>,
    pub stores: Vec<u32>,
}

impl Skeleton {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Generates unlabeled weekly rows over the forecast horizon
#[derive(Debug, Clone, Copy)]
pub struct FutureSkeletonGenerator {
    horizon_months: usize,
    weeks_per_month: usize,
}

impl FutureSkeletonGenerator {
    pub fn new(horizon_months: usize, weeks_per_month: usize) -> Result<Self> {
        if weeks_per_month == 0 {
            return Err(ForecastError::InvalidParameter(
                "weeks_per_month must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            horizon_months,
            weeks_per_month,
        })
    }

    /// Number of future weeks generated per store
    pub fn periods(&self) -> usize {
        self.horizon_months * self.weeks_per_month
    }

    /// Build future rows from a feature-engineered history
    ///
    /// Dates start one week after the latest observed date of the frame. Each
    /// store's covariates are copied from its most recent labeled row with
    /// complete features and held constant; stores without such a row get no
    /// future rows.
    pub fn generate(&self, history: &FeatureFrame) -> Skeleton {
        let mut base_rows: BTreeMap<u32, &SalesRecord> = BTreeMap::new();
        for (record, _) in history.rows().filter(|(r, _)| r.is_labeled()) {
            // Entries are ordered by date within a store
            base_rows.insert(record.store, record);
        }

        let dates = match history.latest_labeled_date() {
            Some(last) => future_weekly_dates(last, self.periods()),
            None => Vec::new(),
        };

        let mut records = Vec::with_capacity(dates.len() * base_rows.len());
        for &date in &dates {
            for base in base_rows.values() {
                records.push(SalesRecord {
                    date,
                    weekly_sales: None,
                    predicted_sales: None,
                    ..(*base).clone()
                });
            }
        }

        let stores: Vec<u32> = base_rows.keys().copied().collect();
        info!(
            stores = stores.len(),
            weeks = dates.len(),
            rows = records.len(),
            "Generated future skeleton"
        );

        Skeleton {
            records,
            dates,
            stores,
        }
    }
}

impl Default for FutureSkeletonGenerator {
    fn default() -> Self {
        Self {
            horizon_months: DEFAULT_HORIZON_MONTHS,
            weeks_per_month: DEFAULT_WEEKS_PER_MONTH,
        }
    }
}
