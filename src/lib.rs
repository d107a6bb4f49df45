//! # Storecast
//!
//! Workspace facade re-exporting the forecasting pipeline and the tree engine.
//!
//! ## Example
//!
//! ```
//! use storecast_workspace::store_forecast::FeatureEngineer;
//! use storecast_workspace::store_forecast::features::FEATURE_NAMES;
//!
//! assert_eq!(FeatureEngineer::feature_names().len(), FEATURE_NAMES.len());
//! ```

pub use store_forecast;
pub use tree_boost;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_inputs_match_engine_layout() {
        let names = store_forecast::FeatureEngineer::feature_names();
        let rows = vec![vec![0.0; names.len()]];
        let matrix = tree_boost::FeatureMatrix::new(names.clone(), rows).unwrap();
        assert_eq!(matrix.feature_names(), names.as_slice());
    }
}
