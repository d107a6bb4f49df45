//! Combining the persisted master dataset with a monthly batch

use crate::data::{ForecastDataset, SalesRecord};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

/// Result of a merge, with counts for the run report
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Master rows followed by batch rows
    pub dataset: ForecastDataset,
    /// Unlabeled rows of an earlier cycle dropped from the master
    pub superseded_forecasts: usize,
    /// Master rows kept
    pub master_rows: usize,
    /// Batch rows appended
    pub batch_rows: usize,
    /// Rows whose (Store, Date) already appeared earlier in the merged data
    pub duplicate_keys: usize,
}

/// Concatenates the master dataset with newly observed records
///
/// Observed rows are never deduplicated. Unlabeled rows of the master are
/// future rows of a previous cycle, predicted or not. Each run regenerates the
/// whole horizon, so they are dropped rather than carried forward.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetMerger;

impl DatasetMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge `batch` onto `master`, failing on any missing required column
    pub fn merge(&self, master: ForecastDataset, batch: ForecastDataset) -> Result<MergeOutcome> {
        Self::check_schema("master dataset", &master)?;
        Self::check_schema("monthly batch", &batch)?;

        let columns = master.columns().to_vec();
        let master_total = master.len();
        let kept: Vec<SalesRecord> = master
            .into_records()
            .into_iter()
            .filter(|r| r.is_labeled())
            .collect();
        let superseded_forecasts = master_total - kept.len();
        let master_rows = kept.len();

        // Batch rows are observations; any forecast column they carry is ignored
        let batch_records: Vec<SalesRecord> = batch
            .into_records()
            .into_iter()
            .map(|mut r| {
                r.predicted_sales = None;
                r
            })
            .collect();
        let batch_rows = batch_records.len();

        let mut records = kept;
        records.extend(batch_records);

        let duplicate_keys = count_duplicate_keys(&records);
        if superseded_forecasts > 0 {
            warn!(
                superseded_forecasts,
                "Dropped future rows from a previous cycle"
            );
        }
        if duplicate_keys > 0 {
            warn!(
                duplicate_keys,
                "Merged data contains repeated (Store, Date) pairs; keeping all of them"
            );
        }
        info!(master_rows, batch_rows, "Merged monthly batch into master");

        Ok(MergeOutcome {
            dataset: ForecastDataset::with_columns(records, columns),
            superseded_forecasts,
            master_rows,
            batch_rows,
            duplicate_keys,
        })
    }

    fn check_schema(source_name: &str, dataset: &ForecastDataset) -> Result<()> {
        let missing = dataset.missing_columns();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ForecastError::SchemaMismatch {
                source_name: source_name.to_string(),
                missing,
            })
        }
    }
}

fn count_duplicate_keys(records: &[SalesRecord]) -> usize {
    let mut seen: HashSet<(u32, NaiveDate)> = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| !seen.insert((r.store, r.date)))
        .count()
}
