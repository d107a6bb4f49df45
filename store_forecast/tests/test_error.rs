use std::path::PathBuf;
use store_forecast::ForecastError;
use tree_boost::BoostError;

#[test]
fn test_error_display() {
    let err = ForecastError::MissingInputFile {
        path: PathBuf::from("Data/base_data.csv"),
    };
    assert_eq!(err.to_string(), "Missing input file: Data/base_data.csv");

    let err = ForecastError::SchemaMismatch {
        source_name: "monthly batch".to_string(),
        missing: vec!["CPI".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "Schema mismatch in monthly batch: missing columns [\"CPI\"]"
    );

    let err = ForecastError::ModelLoadFailure {
        path: PathBuf::from("model.bin"),
        reason: "bad magic".to_string(),
    };
    assert!(err.to_string().contains("model.bin"));
    assert!(err.to_string().contains("bad magic"));
}

#[test]
fn test_boost_errors_are_mapped() {
    let err: ForecastError = BoostError::FeatureMismatch {
        expected: vec!["a".to_string()],
        found: vec!["b".to_string()],
    }
    .into();
    assert!(matches!(
        err,
        ForecastError::PredictionShapeMismatch { ref expected, ref found }
            if expected == &["a"] && found == &["b"]
    ));

    let err: ForecastError = BoostError::InvalidInput("empty".to_string()).into();
    assert!(matches!(err, ForecastError::ModelError(_)));
}

#[test]
fn test_io_and_json_conversions() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    assert!(matches!(ForecastError::from(io), ForecastError::IoError(_)));

    let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(ForecastError::from(json), ForecastError::DataError(_)));
}
