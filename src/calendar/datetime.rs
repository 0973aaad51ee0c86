//! The two literal date formats accepted and produced by the tools.
//!
//! Both are evaluated in the local time zone of the host.

use chrono::{Days, Local, NaiveDate, NaiveDateTime, TimeZone};

use super::Timestamp;

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses `yyyy-MM-dd HH:mm` as local time.
///
/// Returns `None` for malformed input and for wall-clock times skipped by a
/// daylight-saving transition.
pub fn parse_date_time(s: &str) -> Option<Timestamp> {
    let naive = NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).ok()?;
    // chrono skips whitespace and accepts unpadded fields; only the canonical form is valid.
    if naive.format(DATE_TIME_FORMAT).to_string() != s {
        return None;
    }
    to_local(naive)
}

/// Parses `yyyy-MM-dd` as midnight local time on that day.
pub fn parse_date(s: &str) -> Option<Timestamp> {
    let day = parse_day(s)?;
    start_of_day(day)
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    let day = NaiveDate::parse_from_str(s, DATE_FORMAT).ok()?;
    (format_day(day) == s).then_some(day)
}

pub fn format(t: &Timestamp) -> String {
    t.format(DATE_TIME_FORMAT).to_string()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

pub fn to_local(naive: NaiveDateTime) -> Option<Timestamp> {
    Local.from_local_datetime(&naive).earliest()
}

pub fn start_of_day(day: NaiveDate) -> Option<Timestamp> {
    let midnight = day.and_hms_opt(0, 0, 0)?;
    // Some zones jump over midnight on transition days.
    to_local(midnight).or_else(|| to_local(day.and_hms_opt(1, 0, 0)?))
}

/// `[midnight, next midnight)` of `day`.
pub fn day_window(day: NaiveDate) -> Option<(Timestamp, Timestamp)> {
    let next = day.checked_add_days(Days::new(1))?;
    Some((start_of_day(day)?, start_of_day(next)?))
}
