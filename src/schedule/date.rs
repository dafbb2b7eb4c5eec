//! Date override matching
//!
//! Date entries are keyed by their start instant in fixed-width UTC
//! (`YYYYMMDDTHHMMSSZ`), so lexicographic key order is chronological order
//! regardless of the group's timezone or DST. Membership is tested on
//! absolute instants; the timezone only matters when turning a row's wall
//! time into an instant and back.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use super::{localize, ResolveOptions};
use crate::error::{Error, Result};
use crate::models::{Date, DateRow};
use crate::parse::{
    format_time_of_day, parse_date, parse_time_of_day, span_between, stop_time_of_day,
    ValidationError,
};
use crate::store::{Bucket, ReadTxn, WriteTxn};

const KEY_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Store key for an instant
pub fn date_key(at: DateTime<Utc>) -> String {
    at.format(KEY_FORMAT).to_string()
}

/// A parsed date row whose wall time has not yet been placed in the
/// group's timezone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSpec {
    pub group: String,
    pub date: NaiveDate,
    pub start: Duration,
    pub duration: Duration,
    pub target: String,
}

impl DateSpec {
    /// Parse an import row
    pub fn from_row(row: &DateRow) -> Result<Self> {
        let date = parse_date(&row.date)?;
        let start = parse_time_of_day(&row.start)?;
        if start >= Duration::hours(24) {
            return Err(ValidationError::StartOffsetOutOfRange(start.num_seconds()).into());
        }
        let stop = parse_time_of_day(&row.stop)?;
        let duration = span_between(start, stop)?;
        if row.target.is_empty() {
            return Err(Error::EmptyTarget);
        }

        Ok(Self {
            group: row.group.clone(),
            date,
            start,
            duration,
            target: row.target.clone(),
        })
    }

    /// Place the wall-clock start in `tz`
    pub fn localize(self, tz: &Tz) -> Result<Date> {
        let wall = self.date.and_time(NaiveTime::MIN) + self.start;
        let start = localize(tz, wall).ok_or_else(|| {
            ValidationError::NonexistentLocalTime(wall.to_string(), tz.name().to_string())
        })?;
        Date::new(self.group, start, self.duration, self.target)
    }
}

impl Date {
    /// Store key of this entry
    pub fn key(&self) -> String {
        date_key(self.start)
    }

    /// Render as an import row in the group's local time
    pub fn to_row(&self, tz: &Tz) -> DateRow {
        let local = self.start.with_timezone(tz);
        let start = Duration::seconds(i64::from(local.time().num_seconds_from_midnight()));
        DateRow {
            group: self.group.clone(),
            date: local.date_naive().format("%Y-%m-%d").to_string(),
            start: format_time_of_day(start),
            stop: format_time_of_day(stop_time_of_day(start, self.duration)),
            target: self.target.clone(),
        }
    }
}

/// Find the Date override of `group` active at `at`, scanning entries that
/// start within the lookback window. The earliest-starting match wins.
pub fn active_date<T: ReadTxn + ?Sized>(
    txn: &T,
    group: &str,
    at: DateTime<Utc>,
    options: &ResolveOptions,
) -> Result<Option<Date>> {
    let from = date_key(at - options.lookback);
    let to = date_key(at);

    for (_, value) in txn.range(&Bucket::dates(group), from.as_bytes(), to.as_bytes())? {
        let date: Date = serde_json::from_slice(&value)?;
        if date.group == group && options.boundary.contains(date.start, date.stop(), at) {
            tracing::debug!(group = %group, start = %date.start, target = %date.target, "Date override active");
            return Ok(Some(date));
        }
    }

    Ok(None)
}

/// Store a Date entry, replacing any entry with the same start
pub fn put_date<T: WriteTxn + ?Sized>(txn: &mut T, date: &Date) -> Result<()> {
    let value = serde_json::to_vec(date)?;
    txn.put(&Bucket::dates(&date.group), date.key().as_bytes(), &value)?;
    Ok(())
}

/// All Date entries of a group, oldest first
pub fn load_dates<T: ReadTxn + ?Sized>(txn: &T, group: &str) -> Result<Vec<Date>> {
    txn.scan(&Bucket::dates(group))?
        .into_iter()
        .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
        .collect()
}
