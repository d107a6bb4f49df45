use chrono::{Datelike, NaiveDate, Weekday};
use rstest::rstest;
use store_forecast::persist::model_file_name;
use store_forecast::utils::{date_parser, future_weekly_dates, iso_week, quarter};
use store_forecast::window::TrailingWindow;

#[rstest]
#[case("2012-02-03")]
#[case("03-02-2012")]
#[case("03/02/2012")]
#[case("2012/02/03")]
#[case("2012-02-03T00:00:00")]
fn test_date_layouts(#[case] value: &str) {
    let parsed = date_parser::parse_date(value).unwrap();
    assert_eq!(parsed, NaiveDate::from_ymd_opt(2012, 2, 3).unwrap());
    assert_eq!(date_parser::format_date(parsed), "2012-02-03");
}

#[test]
fn test_future_dates_keep_weekday_over_long_horizon() {
    let last = NaiveDate::from_ymd_opt(2012, 10, 26).unwrap();
    let dates = future_weekly_dates(last, 96);

    assert_eq!(dates.len(), 96);
    assert!(dates.iter().all(|d| d.weekday() == Weekday::Fri));
    assert_eq!(dates[95], last + chrono::Duration::days(7 * 96));
    assert!(future_weekly_dates(last, 0).is_empty());
}

#[rstest]
#[case(2012, 1, 6, 1, 1)]
#[case(2012, 3, 30, 1, 13)]
#[case(2012, 4, 6, 2, 14)]
#[case(2012, 12, 28, 4, 52)]
fn test_calendar_helpers(
    #[case] y: i32,
    #[case] m: u32,
    #[case] d: u32,
    #[case] expected_quarter: u32,
    #[case] expected_week: u32,
) {
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    assert_eq!(quarter(date), expected_quarter);
    assert_eq!(iso_week(date), expected_week);
}

#[test]
fn test_trailing_window_drops_oldest() {
    let mut window = TrailingWindow::new(2).unwrap();
    window.push(Some(1.0));
    window.push(Some(2.0));
    window.push(Some(3.0));

    assert_eq!(window.capacity(), 2);
    assert_eq!(window.recent(2), Some(vec![2.0, 3.0]));
    assert_eq!(window.lag(2), Some(2.0));
    assert_eq!(window.lag(3), None);
}

#[test]
fn test_model_file_name() {
    assert_eq!(model_file_name(2012, 3), "xgb_model_2012_03.bin");
    assert_eq!(model_file_name(2013, 11), "xgb_model_2013_11.bin");
}
