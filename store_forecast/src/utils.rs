//! Utility functions for the store_forecast crate

use chrono::{Datelike, Duration, NaiveDate};

/// Parsing and formatting of the `Date` column
pub mod date_parser {
    use crate::error::{ForecastError, Result};
    use chrono::NaiveDate;

    /// Accepted layouts, tried in order; day-first layouts follow the source data
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

    /// Parse a date in any of the accepted layouts
    pub fn parse_date(value: &str) -> Result<NaiveDate> {
        let trimmed = value.trim();
        // Timestamps written as "YYYY-MM-DD HH:MM:SS" keep only the date part
        let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);

        FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
            .ok_or_else(|| ForecastError::DataError(format!("Unrecognized date: '{}'", value)))
    }

    /// Canonical representation used when writing datasets
    pub fn format_date(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }
}

/// Create `periods` weekly dates following `last_date`
pub fn future_weekly_dates(last_date: NaiveDate, periods: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(periods);
    let mut current = last_date;

    for _ in 0..periods {
        current = current + Duration::weeks(1);
        dates.push(current);
    }

    dates
}

/// Calendar quarter (1-4) of a date
pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// ISO-8601 week number of a date
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}
