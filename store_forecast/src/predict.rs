//! Recursive prediction over history plus future rows

use crate::data::SalesRecord;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureEngineer, FeatureFrame};
use crate::models::{check_feature_layout, SalesModel};
use tracing::{debug, info, warn};

/// Result of a prediction run
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// History and future rows, with predictions on the unlabeled ones
    pub frame: FeatureFrame,
    /// Unlabeled rows that received a prediction
    pub predicted_rows: usize,
    /// Unlabeled rows whose features never became defined
    pub unresolved_rows: usize,
    /// Feature-engineering passes that produced predictions
    pub passes: usize,
}

/// Predicts unlabeled rows, chaining each week's forecast into the next
///
/// Future rows take their lag and rolling features from the tail of real
/// history and, further out, from forecasts made in earlier passes. Labeled
/// rows are never predicted.
#[derive(Debug)]
pub struct ForecastPredictor<'a, M: SalesModel> {
    model: &'a M,
    engineer: FeatureEngineer,
}

impl<'a, M: SalesModel> ForecastPredictor<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            engineer: FeatureEngineer::new(),
        }
    }

    /// Predict every unlabeled row of `history` and `future`
    pub fn predict(
        &self,
        history: Vec<SalesRecord>,
        future: Vec<SalesRecord>,
    ) -> Result<ForecastOutcome> {
        let mut records = history;
        records.extend(future);
        // Forecasts are always recomputed from the current model
        for record in records.iter_mut().filter(|r| !r.is_labeled()) {
            record.predicted_sales = None;
        }

        let mut passes = 0;
        let mut predicted_rows = 0;
        let frame = loop {
            let mut frame = self.engineer.engineer(records);
            let pending: Vec<usize> = frame
                .entries()
                .iter()
                .enumerate()
                .filter(|(_, e)| {
                    !e.record.is_labeled() && e.record.predicted_sales.is_none() && e.causal.is_some()
                })
                .map(|(i, _)| i)
                .collect();

            if pending.is_empty() {
                break frame;
            }

            let matrix = frame.matrix_for(&pending)?;
            check_feature_layout(self.model, &matrix)?;
            let predictions = self.model.predict(&matrix)?;
            if predictions.len() != pending.len() {
                return Err(ForecastError::ModelError(format!(
                    "{} returned {} predictions for {} rows",
                    self.model.name(),
                    predictions.len(),
                    pending.len()
                )));
            }

            for (&index, &value) in pending.iter().zip(predictions.iter()) {
                frame.set_prediction(index, value);
            }

            passes += 1;
            predicted_rows += pending.len();
            debug!(pass = passes, rows = pending.len(), "Predicted pending rows");
            records = frame.into_records();
        };

        let unresolved_rows = frame
            .entries()
            .iter()
            .filter(|e| !e.record.is_labeled() && e.record.predicted_sales.is_none())
            .count();
        if unresolved_rows > 0 {
            warn!(
                unresolved_rows,
                "Some unlabeled rows never had complete features and were not predicted"
            );
        }
        info!(predicted_rows, passes, "Prediction finished");

        Ok(ForecastOutcome {
            frame,
            predicted_rows,
            unresolved_rows,
            passes,
        })
    }
}
