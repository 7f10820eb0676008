use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use std::time::SystemTime;
use thiserror::Error;

/// Layout of `DateTimeOriginal` / `DateTimeDigitized` values.
pub const EXIF_DATE_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Layout accepted by `--date`.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("日時の形式が不正です (YYYY:MM:DD HH:MM:SS): {0}")]
    InvalidDateTime(String),
    #[error("日付の形式が不正です (YYYY:MM:DD): {0}")]
    InvalidDate(String),
    #[error("補正後の日時が範囲外です: {0}")]
    OutOfRange(String),
}

pub fn parse_exif_date_time(input: &str) -> Result<NaiveDateTime, TimestampError> {
    let normalized = input.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(normalized, EXIF_DATE_TIME_FORMAT)
        .map_err(|_| TimestampError::InvalidDateTime(input.to_string()))
}

pub fn format_exif_date_time(value: &NaiveDateTime) -> String {
    value.format(EXIF_DATE_TIME_FORMAT).to_string()
}

pub fn parse_fixed_date(input: &str) -> Result<NaiveDate, TimestampError> {
    NaiveDate::parse_from_str(input.trim(), EXIF_DATE_FORMAT)
        .map_err(|_| TimestampError::InvalidDate(input.to_string()))
}

/// Replaces the calendar date (keeping time of day) when `fixed_date` is set,
/// then adds `shift`.
pub fn correct_timestamp(
    original: NaiveDateTime,
    fixed_date: Option<NaiveDate>,
    shift: TimeDelta,
) -> Result<NaiveDateTime, TimestampError> {
    let base = match fixed_date {
        Some(date) => date.and_time(original.time()),
        None => original,
    };
    base.checked_add_signed(shift)
        .ok_or_else(|| TimestampError::OutOfRange(format_exif_date_time(&base)))
}

/// EXIF timestamps carry no offset, so they are read as local wall-clock time.
pub fn to_system_time(value: &NaiveDateTime) -> SystemTime {
    let local: DateTime<Local> = Local
        .from_local_datetime(value)
        .earliest()
        .unwrap_or_else(|| Utc.from_utc_datetime(value).with_timezone(&Local));
    SystemTime::from(local)
}

#[cfg(test)]
mod tests {
    use super::{
        correct_timestamp, format_exif_date_time, parse_exif_date_time, parse_fixed_date,
        to_system_time, TimestampError,
    };
    use chrono::{Local, NaiveDate, TimeDelta, TimeZone};
    use std::time::SystemTime;

    fn at(text: &str) -> chrono::NaiveDateTime {
        parse_exif_date_time(text).expect("valid exif date time")
    }

    #[test]
    fn parse_accepts_nul_padded_values() {
        let parsed = at("2019:06:15 10:30:00\0");
        assert_eq!(format_exif_date_time(&parsed), "2019:06:15 10:30:00");
    }

    #[test]
    fn parse_rejects_iso_layout() {
        let err = parse_exif_date_time("2019-06-15T10:30:00").expect_err("must fail");
        assert!(matches!(err, TimestampError::InvalidDateTime(_)));
    }

    #[test]
    fn shift_is_added_once() {
        let corrected = correct_timestamp(
            at("2019:06:15 10:30:00"),
            None,
            TimeDelta::try_minutes(120).expect("minutes"),
        )
        .expect("in range");
        assert_eq!(format_exif_date_time(&corrected), "2019:06:15 12:30:00");
    }

    #[test]
    fn fixed_date_replaces_calendar_date_only() {
        let date = parse_fixed_date("2020:01:01").expect("valid date");
        let corrected =
            correct_timestamp(at("2019:06:15 10:30:00"), Some(date), TimeDelta::zero())
                .expect("in range");
        assert_eq!(format_exif_date_time(&corrected), "2020:01:01 10:30:00");
    }

    #[test]
    fn fixed_date_is_applied_before_shift() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).expect("date");
        let corrected = correct_timestamp(
            at("2019:06:15 23:30:00"),
            Some(date),
            TimeDelta::try_minutes(60).expect("minutes"),
        )
        .expect("in range");
        assert_eq!(format_exif_date_time(&corrected), "2020:01:02 00:30:00");
    }

    #[test]
    fn negative_shift_rolls_back_across_month_boundary() {
        let corrected = correct_timestamp(
            at("2021:03:01 00:20:00"),
            None,
            TimeDelta::try_minutes(-90).expect("minutes"),
        )
        .expect("in range");
        assert_eq!(format_exif_date_time(&corrected), "2021:02:28 22:50:00");
    }

    #[test]
    fn negative_shift_rolls_back_across_year_boundary() {
        let corrected = correct_timestamp(
            at("2022:01:01 00:05:00"),
            None,
            TimeDelta::try_minutes(-10).expect("minutes"),
        )
        .expect("in range");
        assert_eq!(format_exif_date_time(&corrected), "2021:12:31 23:55:00");
    }

    #[test]
    fn overflowing_shift_is_out_of_range() {
        let err = correct_timestamp(
            at("2019:06:15 10:30:00"),
            None,
            TimeDelta::try_days(365 * 300_000).expect("days"),
        )
        .expect_err("must overflow");
        assert!(matches!(err, TimestampError::OutOfRange(_)));
    }

    #[test]
    fn parse_fixed_date_rejects_dashes() {
        let err = parse_fixed_date("2020-01-01").expect_err("must fail");
        assert_eq!(err, TimestampError::InvalidDate("2020-01-01".to_string()));
    }

    #[test]
    fn system_time_matches_local_wall_clock() {
        let value = at("2021:07:04 12:00:00");
        let expected = SystemTime::from(
            Local
                .from_local_datetime(&value)
                .earliest()
                .expect("unambiguous local time"),
        );
        assert_eq!(to_system_time(&value), expected);
    }
}
