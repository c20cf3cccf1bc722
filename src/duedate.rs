//! Due-date arithmetic
//!
//! Pure helpers for the event sweep: reprojecting a stored (possibly
//! past-year) due date onto its next occurrence, combining it with the due
//! time, and formatting a countdown for display.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::SECS_PER_DAY;
use crate::error::{AppError, Result};

/// Storage format of an event due date, e.g. "2 April 1958".
pub const DATE_DUE_FORMAT: &str = "%d %B %Y";

/// Storage format of an event due time, 24-hour "HH:MM".
pub const TIME_DUE_FORMAT: &str = "%H:%M";

/// Parse a stored due date string.
pub fn parse_date_due(date_due: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(date_due.trim(), DATE_DUE_FORMAT)?)
}

/// Reproject a stored due date onto its next occurrence on or after `today`.
///
/// Only the year is ever adjusted, never the day or month:
/// 1. a year before the current year re-anchors to the current year;
/// 2. a month before the current month pushes to next year;
/// 3. an earlier day within the current month pushes to next year.
///
/// A date falling exactly on `today` is not advanced; it is due today.
pub fn resolve_due_date(date_due: &str, today: NaiveDate) -> Result<NaiveDate> {
    let stored = parse_date_due(date_due)?;

    let mut due_year = stored.year();
    if due_year < today.year() {
        due_year = today.year();
    }
    if stored.month() < today.month() {
        due_year = today.year() + 1;
    }
    if due_year == today.year() && stored.month() == today.month() && stored.day() < today.day() {
        due_year = today.year() + 1;
    }

    NaiveDate::from_ymd_opt(due_year, stored.month(), stored.day()).ok_or_else(|| {
        AppError::InvalidDate(format!(
            "{}/{}/{} does not exist",
            stored.day(),
            stored.month(),
            due_year
        ))
    })
}

/// Combine a resolved due date with a stored "HH:MM" due time into the
/// absolute due instant.
pub fn due_instant(due_date: NaiveDate, time_due: &str) -> Result<NaiveDateTime> {
    let time = NaiveTime::parse_from_str(time_due.trim(), TIME_DUE_FORMAT)?;
    Ok(due_date.and_time(time))
}

/// Format a countdown in whole seconds for display.
///
/// At least a day left gives "{d}d {h}h:{m}m", at least an hour left
/// "{h}h {m}m", otherwise "{m}m", all truncated. A countdown that has
/// already passed clamps to "0m".
pub fn format_remaining(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / SECS_PER_DAY;
    let hours = (seconds % SECS_PER_DAY) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h:{minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
