use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum DateError {
    #[error("expected YYYY-MM-DD")]
    Malformed,

    #[error(transparent)]
    Parse(#[from] chrono::ParseError),

    #[error("date has no representable week start")]
    OutOfRange,
}

/// Parses exactly `YYYY-MM-DD`: ten ASCII characters, no sign, no padding.
pub fn parse_date(value: &str) -> Result<NaiveDate, DateError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        });

    if !well_formed {
        return Err(DateError::Malformed);
    }

    Ok(NaiveDate::parse_from_str(value, DATE_FORMAT)?)
}

/// Day of week numbered 1 (Sunday) through 7 (Saturday).
pub fn day_of_week_sunday_start(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday() + 1
}

/// The Sunday on or before `date`. Weeks start on Sunday, the warehouse's
/// default for `DATE_TRUNC(date, WEEK)`.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
}

pub fn month_start(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)
}

/// Sunday or Saturday, i.e. day-of-week codes 1 and 7 in the Sunday-start
/// numbering used by `week_start`.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(day_of_week_sunday_start(date), 1 | 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn parses_iso_dates_and_rejects_garbage() {
        assert_eq!(parse_date("2024-11-23").unwrap(), ymd(2024, 11, 23));
        assert!(matches!(parse_date("23/11/2024"), Err(DateError::Malformed)));
        assert!(matches!(parse_date("2024-02-30"), Err(DateError::Parse(_))));
        assert!(matches!(parse_date(""), Err(DateError::Malformed)));
    }

    #[test]
    fn rejects_non_canonical_forms() {
        for value in [
            "-262143-01-01",
            "+2024-11-23",
            " 2024-11-23 ",
            "2024-11-23 ",
            "2024-1-5",
            "2024-11-5",
            "12024-11-23",
            "2024/11/23",
            "２０２４-11-23",
        ] {
            assert!(
                matches!(parse_date(value), Err(DateError::Malformed)),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn weekday_codes_run_sunday_to_saturday() {
        assert_eq!(day_of_week_sunday_start(ymd(2024, 11, 24)), 1);
        assert_eq!(day_of_week_sunday_start(ymd(2024, 11, 25)), 2);
        assert_eq!(day_of_week_sunday_start(ymd(2024, 11, 23)), 7);
    }

    #[test]
    fn week_starts_on_the_preceding_sunday() {
        assert_eq!(week_start(ymd(2024, 11, 23)), Some(ymd(2024, 11, 17)));
        assert_eq!(week_start(ymd(2024, 11, 24)), Some(ymd(2024, 11, 24)));
        assert_eq!(week_start(ymd(2024, 11, 20)), Some(ymd(2024, 11, 17)));
        // crosses a month and year boundary
        assert_eq!(week_start(ymd(2025, 1, 1)), Some(ymd(2024, 12, 29)));
        assert_eq!(week_start(ymd(0, 1, 1)), Some(ymd(-1, 12, 26)));
    }

    #[test]
    fn week_start_before_the_calendar_floor_is_none() {
        assert_ne!(NaiveDate::MIN.weekday().num_days_from_sunday(), 0);
        assert_eq!(week_start(NaiveDate::MIN), None);
    }

    #[test]
    fn month_start_is_first_day() {
        assert_eq!(month_start(ymd(2024, 11, 23)), Some(ymd(2024, 11, 1)));
        assert_eq!(month_start(ymd(2024, 2, 29)), Some(ymd(2024, 2, 1)));
        assert_eq!(month_start(ymd(2024, 9, 1)), Some(ymd(2024, 9, 1)));
    }

    #[test]
    fn weekend_is_saturday_and_sunday() {
        assert!(is_weekend(ymd(2024, 11, 23)));
        assert!(is_weekend(ymd(2024, 11, 24)));
        for day in 18..=22 {
            assert!(!is_weekend(ymd(2024, 11, day)));
        }
    }
}
