//! UTC calendar arithmetic used by transaction filters and the billing job.

use crate::errors::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};

fn invalid_date(year: i32, month: u32, day: u32) -> Error {
    Error::invalid_field("date", format!("{year:04}-{month:02}-{day:02} is not a valid date"))
}

/// UTC midnight of the given calendar date.
///
/// # Errors
/// Returns a validation error when the date does not exist.
pub fn utc_midnight(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| invalid_date(year, month, day))
}

/// Year and month following `(year, month)`.
#[must_use]
pub const fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Number of days in the given month, accounting for leap years.
///
/// # Errors
/// Returns a validation error for a month outside 1-12.
pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let (next_year, next) = next_month(year, month);
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid_date(year, month, 1))?;
    let first_of_next =
        NaiveDate::from_ymd_opt(next_year, next, 1).ok_or_else(|| invalid_date(next_year, next, 1))?;
    let days = first_of_next.signed_duration_since(first).num_days();
    u32::try_from(days).map_err(|_| invalid_date(year, month, 1))
}

/// Half-open UTC window `[month start, next month start)`.
pub fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (next_year, next) = next_month(year, month);
    Ok((utc_midnight(year, month, 1)?, utc_midnight(next_year, next, 1)?))
}

/// Half-open UTC window `[Jan 1, next Jan 1)`.
pub fn year_bounds(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((utc_midnight(year, 1, 1)?, utc_midnight(year + 1, 1, 1)?))
}
