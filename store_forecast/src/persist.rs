//! Writing the master dataset and the versioned model artifact
//!
//! Every file is first written next to its target as `<name>.tmp`, validated by
//! reading it back, and only then renamed over the target. Targets that already
//! exist are moved aside to `<name>.bak` first. If any rename fails, committed
//! files are reverted and the previous artifacts remain untouched.

use crate::data::{DataLoader, SalesRecord, PREDICTED_COLUMN, REQUIRED_COLUMNS};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureFrame, FrameEntry, DERIVED_COLUMNS};
use crate::metrics::{downstream_rows, stage_downstream_csv};
use crate::utils::date_parser::format_date;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tree_boost::Booster;

/// Paths and counts of a successful persist
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedArtifacts {
    pub master_path: PathBuf,
    pub model_path: PathBuf,
    pub downstream_path: Option<PathBuf>,
    pub master_rows: usize,
}

/// File name of the model artifact for the batch of `year`/`month`
pub fn model_file_name(year: i32, month: u32) -> String {
    format!("xgb_model_{}_{:02}.bin", year, month)
}

/// Header of the persisted master dataset
pub fn master_columns() -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .chain(std::iter::once(&PREDICTED_COLUMN))
        .chain(DERIVED_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect()
}

/// Sibling path used to stage a write to `target`
pub(crate) fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    target.with_file_name(name)
}

/// Move a staged file over its target, removing it if the move fails
pub(crate) fn commit_staged(staging: &Path, target: &Path) -> Result<()> {
    commit_all(&[(staging.to_path_buf(), target.to_path_buf())])
}

/// Move every `(staging, target)` pair into place, in order
///
/// Either all targets are replaced or none is: on the first failed rename the
/// targets already committed are restored from their backups (or removed when
/// they did not exist before) and every staged file is deleted.
pub(crate) fn commit_all(files: &[(PathBuf, PathBuf)]) -> Result<()> {
    let mut committed: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(files.len());

    for (staging, target) in files {
        if let Err(e) = commit_one(staging, target, &mut committed) {
            for (target, backup) in committed.iter().rev() {
                let restored = match backup {
                    Some(backup) => fs::rename(backup, target),
                    None => fs::remove_file(target),
                };
                if let Err(restore_error) = restored {
                    warn!(
                        target = %target.display(),
                        error = %restore_error,
                        "Failed to revert committed file"
                    );
                }
            }
            for (staging, _) in files {
                let _ = fs::remove_file(staging);
            }
            return Err(e);
        }
    }

    for (_, backup) in committed {
        if let Some(backup) = backup {
            let _ = fs::remove_file(backup);
        }
    }
    Ok(())
}

fn commit_one<'a>(
    staging: &Path,
    target: &'a Path,
    committed: &mut Vec<(&'a Path, Option<PathBuf>)>,
) -> Result<()> {
    let backup = if target.exists() {
        let backup = backup_path(target);
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(staging, target) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, target);
        }
        return Err(e.into());
    }

    committed.push((target, backup));
    Ok(())
}

/// Writes run outputs atomically
#[derive(Debug, Clone)]
pub struct ArtifactPersister {
    output_dir: PathBuf,
    downstream_path: Option<PathBuf>,
}

impl ArtifactPersister {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            downstream_path: None,
        }
    }

    /// Also write the downstream table to `path` as part of the same commit
    pub fn with_downstream_path(mut self, path: Option<PathBuf>) -> Self {
        self.downstream_path = path;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the model of the batch `year`/`month` is written to
    pub fn model_path(&self, year: i32, month: u32) -> PathBuf {
        self.output_dir.join(model_file_name(year, month))
    }

    /// Overwrite the master dataset and write the model named by `period`
    ///
    /// The master is committed last, so a run is only visible in the master
    /// once the model and downstream table are in place.
    pub fn persist(
        &self,
        frame: &FeatureFrame,
        master_path: &Path,
        model: &Booster,
        period: (i32, u32),
    ) -> Result<PersistedArtifacts> {
        fs::create_dir_all(&self.output_dir)?;
        let model_path = self.model_path(period.0, period.1);

        let mut files = vec![(staging_path(&model_path), model_path.clone())];
        if let Some(path) = &self.downstream_path {
            files.push((staging_path(path), path.clone()));
        }
        files.push((staging_path(master_path), master_path.to_path_buf()));

        let staged = self.stage_model(model, &files[0].0).and_then(|_| {
            if let Some(path) = &self.downstream_path {
                stage_downstream_csv(&downstream_rows(frame), &staging_path(path))?;
            }
            self.stage_master(frame, &staging_path(master_path))
        });
        if let Err(e) = staged {
            for (staging, _) in &files {
                let _ = fs::remove_file(staging);
            }
            return Err(e);
        }

        commit_all(&files)?;

        info!(
            master = %master_path.display(),
            model = %model_path.display(),
            rows = frame.len(),
            "Persisted run artifacts"
        );

        Ok(PersistedArtifacts {
            master_path: master_path.to_path_buf(),
            model_path,
            downstream_path: self.downstream_path.clone(),
            master_rows: frame.len(),
        })
    }

    fn stage_master(&self, frame: &FeatureFrame, staging: &Path) -> Result<()> {
        write_master(frame, staging)?;

        let reloaded = DataLoader::from_csv(staging)?;
        if reloaded.len() != frame.len() {
            return Err(ForecastError::DataError(format!(
                "Staged master has {} rows, expected {}",
                reloaded.len(),
                frame.len()
            )));
        }
        Ok(())
    }

    fn stage_model(&self, model: &Booster, staging: &Path) -> Result<()> {
        model.save(staging)?;

        let reloaded = Booster::load(staging).map_err(|e| ForecastError::ModelLoadFailure {
            path: staging.to_path_buf(),
            reason: e.to_string(),
        })?;
        if reloaded.num_trees() != model.num_trees() {
            return Err(ForecastError::ModelError(format!(
                "Staged model has {} trees, expected {}",
                reloaded.num_trees(),
                model.num_trees()
            )));
        }
        Ok(())
    }
}

/// Write every record of `frame` with its derived columns
pub fn write_master(frame: &FeatureFrame, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(master_columns())?;
    for entry in frame.entries() {
        writer.write_record(master_row(entry))?;
    }
    writer.flush()?;
    Ok(())
}

fn master_row(entry: &FrameEntry) -> Vec<String> {
    let record: &SalesRecord = &entry.record;
    let mut row = vec![
        record.store.to_string(),
        format_date(record.date),
        optional(record.weekly_sales),
        if record.holiday_flag { "1" } else { "0" }.to_string(),
        record.temperature.to_string(),
        record.fuel_price.to_string(),
        record.cpi.to_string(),
        record.unemployment.to_string(),
        optional(record.predicted_sales),
        entry.calendar.year.to_string(),
        entry.calendar.month.to_string(),
        entry.calendar.week.to_string(),
        entry.calendar.quarter.to_string(),
    ];

    match &entry.causal {
        Some(c) => row.extend(
            [
                c.lags[0],
                c.lags[1],
                c.lags[2],
                c.rolling_mean[0],
                c.rolling_std[0],
                c.rolling_mean[1],
                c.rolling_std[1],
                c.pct_change,
            ]
            .iter()
            .map(|v| v.to_string()),
        ),
        None => row.extend(std::iter::repeat(String::new()).take(8)),
    }
    row
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
