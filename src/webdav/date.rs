//! Strict parser for the fixed-width HTTP date used by `getlastmodified`.
//!
//! Only the exact shape `Www, DD Mmm YYYY HH:MM:SS GMT` is accepted. Weekday, month
//! and zone tokens match case-insensitively; every other byte must be where it is
//! expected. The stated weekday is checked against the calendar.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use thiserror::Error;

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("mon", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("sat", Weekday::Sat),
    ("sun", Weekday::Sun),
];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const ZONE: &str = "gmt";

// "Mon, 12 Jan 1998 09:25:56 GMT"
const DATE_LEN: usize = 29;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("invalid date format: {0:?}")]
    Format(String),
    #[error("date out of range: {0:?}")]
    OutOfRange(String),
    #[error("weekday mismatch in {input:?}: stated {stated}, actual {actual}")]
    WeekdayMismatch {
        input: String,
        stated: Weekday,
        actual: Weekday,
    },
}

/// Parse `text` into a UTC instant, failing on any deviation from the fixed format.
pub fn parse_http_date(text: &str) -> Result<DateTime<Utc>, DateParseError> {
    let format_err = || DateParseError::Format(text.to_string());

    let bytes = text.as_bytes();
    if bytes.len() != DATE_LEN || !text.is_ascii() {
        return Err(format_err());
    }

    let literal_at = |idx: usize, expected: u8| bytes[idx] == expected;
    if !(literal_at(3, b',')
        && literal_at(4, b' ')
        && literal_at(7, b' ')
        && literal_at(11, b' ')
        && literal_at(16, b' ')
        && literal_at(19, b':')
        && literal_at(22, b':')
        && literal_at(25, b' '))
    {
        return Err(format_err());
    }

    let stated = lookup_weekday(&text[0..3]).ok_or_else(format_err)?;
    let day = digits(&text[5..7]).ok_or_else(format_err)?;
    let month = lookup_month(&text[8..11]).ok_or_else(format_err)?;
    let year = digits(&text[12..16]).ok_or_else(format_err)?;
    let hour = digits(&text[17..19]).ok_or_else(format_err)?;
    let minute = digits(&text[20..22]).ok_or_else(format_err)?;
    let second = digits(&text[23..25]).ok_or_else(format_err)?;
    if !text[26..29].eq_ignore_ascii_case(ZONE) {
        return Err(format_err());
    }

    let out_of_range = || DateParseError::OutOfRange(text.to_string());
    let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(out_of_range)?;
    let actual = date.weekday();
    if actual != stated {
        return Err(DateParseError::WeekdayMismatch {
            input: text.to_string(),
            stated,
            actual,
        });
    }

    let naive = date
        .and_hms_opt(hour, minute, second)
        .ok_or_else(out_of_range)?;
    Ok(naive.and_utc())
}

/// Non-failing variant of [`parse_http_date`].
pub fn parse_http_date_opt(text: &str) -> Option<DateTime<Utc>> {
    parse_http_date(text).ok()
}

fn digits(field: &str) -> Option<u32> {
    if field.bytes().all(|b| b.is_ascii_digit()) {
        field.parse().ok()
    } else {
        None
    }
}

fn lookup_weekday(token: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(name, _)| token.eq_ignore_ascii_case(name))
        .map(|(_, weekday)| *weekday)
}

fn lookup_month(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|name| token.eq_ignore_ascii_case(name))
        .map(|idx| idx as u32 + 1)
}
