//! Shared date and naming helpers for the sensor compliance pipeline

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;

/// Longest span, in days, requested from the readings endpoint in one call
pub const WINDOW_DAYS: i64 = 7;

/// Date format expected by the readings endpoint
pub const API_DATE_FORMAT: &str = "%m/%d/%Y";

/// Inclusive date window sent to the readings endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn from_param(&self) -> String {
        self.from.format(API_DATE_FORMAT).to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format(API_DATE_FORMAT).to_string()
    }

    /// Number of calendar days covered, bounds included
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

/// Decode a `/Date(<millis>)/` timestamp into a UTC instant
///
/// Anything that is not exactly in the wrapped form decodes to `None`.
///
/// # Examples
///
/// ```
/// use sensor_compliance::utils::decode_wrapped_timestamp;
///
/// let ts = decode_wrapped_timestamp("/Date(1700000000000)/").unwrap();
/// assert_eq!(ts.timestamp_millis(), 1_700_000_000_000);
/// assert!(decode_wrapped_timestamp("bad").is_none());
/// ```
pub fn decode_wrapped_timestamp(value: &str) -> Option<DateTime<Utc>> {
    static WRAPPED: OnceLock<Option<Regex>> = OnceLock::new();
    let re = WRAPPED
        .get_or_init(|| Regex::new(r"^/Date\((-?\d+)\)/$").ok())
        .as_ref()?;

    let millis = re.captures(value.trim())?.get(1)?.as_str().parse::<i64>().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// First and last day of a calendar month, or `None` for an invalid period
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_month.pred_opt()?))
}

/// Split `[start, end]` into consecutive windows of at most [`WINDOW_DAYS`] days
pub fn date_windows(start: NaiveDate, end: NaiveDate) -> Vec<DateWindow> {
    let mut windows = Vec::new();
    let mut current = start;

    while current <= end {
        let window_end = (current + Duration::days(WINDOW_DAYS - 1)).min(end);
        windows.push(DateWindow {
            from: current,
            to: window_end,
        });
        current = window_end + Duration::days(1);
    }

    windows
}

/// Windows covering one calendar month
pub fn month_windows(year: i32, month: u32) -> Vec<DateWindow> {
    match month_bounds(year, month) {
        Some((first, last)) => date_windows(first, last),
        None => Vec::new(),
    }
}

/// Human-readable period, e.g. "December 2024"
pub fn month_label(year: i32, month: u32) -> String {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(date) => format!("{} {}", month_name(date.month()), date.year()),
        None => format!("{year}-{month:02}"),
    }
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Make a sensor identifier safe to embed in a file name
///
/// ASCII letters, digits and `-` pass through; every other byte becomes `_XX`
/// (uppercase hex), `_` included, so distinct identifiers never share a token.
pub fn file_token(value: &str) -> String {
    let mut token = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            token.push(char::from(byte));
        } else {
            token.push_str(&format!("_{byte:02X}"));
        }
    }
    token
}
