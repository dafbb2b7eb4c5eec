//! Token parsers for imported schedule rows
//!
//! Rows come from spreadsheet exports, so the parsers are lenient about
//! case and surrounding whitespace but strict about structure.

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::models::Weekday;

/// Errors raised while validating tokens, rows and records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Row does not have the expected number of columns
    #[error("Expected {expected} fields (group, day/date, start, stop, target), found {found}")]
    FieldCount { expected: usize, found: usize },

    /// Unknown weekday token
    #[error("Failed to parse '{0}' as weekday")]
    InvalidWeekday(String),

    /// Time not in HH:MM[:SS] form or out of range
    #[error("Time must be formatted as HH:MM[:SS], got '{0}'")]
    InvalidTime(String),

    /// Date not in YYYY-MM-DD form
    #[error("Date must be formatted as YYYY-MM-DD, got '{0}'")]
    InvalidDate(String),

    /// Start and stop are the same time of day
    #[error("Start and stop times are equal; window would be empty")]
    EmptySpan,

    /// Duration is zero or negative
    #[error("Duration must be positive, got {0} seconds")]
    NonPositiveDuration(i64),

    /// Start offset is not within a single day
    #[error("Start offset must be less than 24 hours, got {0} seconds")]
    StartOffsetOutOfRange(i64),

    /// Group identifier is empty
    #[error("Group identifier cannot be empty")]
    EmptyGroupId,

    /// Not an IANA timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Wall time falls into a DST gap of the group's timezone
    #[error("Local time {0} does not exist in timezone {1}")]
    NonexistentLocalTime(String, String),

    /// Lookback is not positive or exceeds six days
    #[error("Lookback must be positive and at most 144 hours, got {0} seconds")]
    LookbackOutOfRange(i64),
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ValidationError>;

/// Parse a weekday token.
///
/// Accepts `0`-`7` (both `0` and `7` are Sunday) and the usual English
/// abbreviations and full names, case-insensitively.
pub fn parse_weekday(token: &str) -> ParseResult<Weekday> {
    let day = match token.trim().to_ascii_lowercase().as_str() {
        "1" | "m" | "mo" | "mon" | "monday" => Weekday::Monday,
        "2" | "t" | "tu" | "tue" | "tues" | "tuesday" => Weekday::Tuesday,
        "3" | "w" | "we" | "wed" | "wednesday" => Weekday::Wednesday,
        "4" | "h" | "th" | "thu" | "thur" | "thurs" | "thursday" => Weekday::Thursday,
        "5" | "f" | "fr" | "fri" | "friday" => Weekday::Friday,
        "6" | "s" | "sa" | "sat" | "saturday" => Weekday::Saturday,
        "0" | "7" | "u" | "su" | "sun" | "sunday" => Weekday::Sunday,
        _ => return Err(ValidationError::InvalidWeekday(token.to_string())),
    };
    Ok(day)
}

/// Parse an `HH:MM` or `HH:MM:SS` wall time into the offset from midnight.
///
/// `24:00` is accepted so that a window can end at midnight. Seconds that
/// do not parse are dropped with a warning.
pub fn parse_time_of_day(token: &str) -> ParseResult<Duration> {
    let invalid = || ValidationError::InvalidTime(token.to_string());
    let pieces: Vec<&str> = token.trim().split(':').collect();
    if pieces.len() < 2 || pieces.len() > 3 {
        return Err(invalid());
    }

    let hours: i64 = pieces[0].trim().parse().map_err(|_| invalid())?;
    let minutes: i64 = pieces[1].trim().parse().map_err(|_| invalid())?;
    if !(0..=24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    let mut seconds = 0;
    if let Some(raw) = pieces.get(2) {
        match raw.trim().parse::<i64>() {
            Ok(s) if (0..60).contains(&s) => seconds = s,
            Ok(_) => return Err(invalid()),
            Err(_) => {
                tracing::warn!(time = %token, "Seconds supplied but were unparseable; ignoring");
            }
        }
    }

    if hours == 24 && (minutes != 0 || seconds != 0) {
        return Err(invalid());
    }

    Ok(Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds))
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(token: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(token.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(token.to_string()))
}

/// Length of the window from `start` to `stop`, both offsets from midnight.
///
/// A stop earlier than the start wraps past midnight.
pub fn span_between(start: Duration, stop: Duration) -> ParseResult<Duration> {
    let mut span = stop - start;
    if span < Duration::zero() {
        span = span + Duration::hours(24);
    }
    if span == Duration::zero() {
        return Err(ValidationError::EmptySpan);
    }
    Ok(span)
}

/// Inverse of [`span_between`]: the stop time of a window of length `span`
/// starting at `start`. A window ending exactly at midnight stops at `24:00`.
pub fn stop_time_of_day(start: Duration, span: Duration) -> Duration {
    let day = Duration::hours(24);
    let mut stop = start + span;
    while stop > day {
        stop = stop - day;
    }
    stop
}

/// Render an offset from midnight as `HH:MM`, with `:SS` only when needed
pub fn format_time_of_day(offset: Duration) -> String {
    let total = offset.num_seconds();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if seconds == 0 {
        format!("{hours:02}:{minutes:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
