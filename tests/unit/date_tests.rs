use chrono::{TimeZone, Utc, Weekday};
use fast_webdav_rs::{DateParseError, parse_http_date, parse_http_date_opt};

#[test]
fn parses_fixed_width_http_date() {
    let parsed = parse_http_date("Mon, 12 Jan 1998 09:25:56 GMT").expect("valid date");
    assert_eq!(parsed, Utc.with_ymd_and_hms(1998, 1, 12, 9, 25, 56).unwrap());
}

#[test]
fn tokens_match_case_insensitively() {
    let parsed = parse_http_date("mON, 12 jan 1998 09:25:56 gmt").expect("valid date");
    assert_eq!(parsed, Utc.with_ymd_and_hms(1998, 1, 12, 9, 25, 56).unwrap());
}

#[test]
fn rejects_wrong_weekday() {
    let err = parse_http_date("Wed, 12 Jan 1998 09:25:56 GMT").unwrap_err();
    match err {
        DateParseError::WeekdayMismatch { stated, actual, .. } => {
            assert_eq!(stated, Weekday::Wed);
            assert_eq!(actual, Weekday::Mon);
        }
        other => panic!("expected weekday mismatch, got {other:?}"),
    }
    assert!(err_message("Wed, 12 Jan 1998 09:25:56 GMT").contains("weekday mismatch"));
}

#[test]
fn rejects_single_digit_day() {
    let err = parse_http_date("Fri, 9 Jan 1998 09:25:56 GMT").unwrap_err();
    assert!(matches!(err, DateParseError::Format(_)));
}

#[test]
fn rejects_doubled_space() {
    let err = parse_http_date("Mon,  12 Jan 1998 09:25:56 GMT").unwrap_err();
    assert!(matches!(err, DateParseError::Format(_)));
}

#[test]
fn rejects_numeric_offsets_and_other_zones() {
    for input in [
        "Mon, 12 Jan 1998 09:25:56 +0000",
        "Mon, 12 Jan 1998 09:25:56 UTC",
        "Mon, 12 Jan 1998 09:25:56 GMT+1",
    ] {
        assert!(
            matches!(parse_http_date(input), Err(DateParseError::Format(_))),
            "{input} should be a format error"
        );
    }
}

#[test]
fn rejects_unknown_month_and_weekday_names() {
    assert!(parse_http_date("Mon, 12 Foo 1998 09:25:56 GMT").is_err());
    assert!(parse_http_date("Xyz, 12 Jan 1998 09:25:56 GMT").is_err());
}

#[test]
fn rejects_negative_or_short_years() {
    assert!(parse_http_date("Mon, 12 Jan -998 09:25:56 GMT").is_err());
    assert!(parse_http_date("Mon, 12 Jan 98 09:25:56 GMT").is_err());
}

#[test]
fn impossible_calendar_values_are_out_of_range() {
    assert!(matches!(
        parse_http_date("Mon, 31 Feb 1998 09:25:56 GMT"),
        Err(DateParseError::OutOfRange(_))
    ));
    assert!(matches!(
        parse_http_date("Mon, 12 Jan 1998 24:00:00 GMT"),
        Err(DateParseError::OutOfRange(_))
    ));
}

#[test]
fn leap_day_is_accepted() {
    let parsed = parse_http_date("Thu, 29 Feb 2024 00:00:00 GMT").expect("leap day");
    assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
}

#[test]
fn optional_variant_returns_none_instead_of_failing() {
    assert!(parse_http_date_opt("Mon, 12 Jan 1998 09:25:56 GMT").is_some());
    assert!(parse_http_date_opt("Wed, 12 Jan 1998 09:25:56 GMT").is_none());
    assert!(parse_http_date_opt("").is_none());
    assert!(parse_http_date_opt("2024-01-01T00:00:00Z").is_none());
}

fn err_message(input: &str) -> String {
    parse_http_date(input).unwrap_err().to_string()
}
