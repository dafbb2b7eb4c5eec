//! Core data structures: routing groups, weekly template entries and
//! absolute-date overrides.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parse::ValidationError;

// ============================================================================
// Weekday
// ============================================================================

/// Day of the week, ordered Sunday (0) through Saturday (6).
///
/// The ordinal is what the weekly template keys are built from, so it is
/// fixed here instead of borrowed from a clock library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// All weekdays in key order
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Position in the week, 0 = Sunday
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Weekday for an ordinal in `0..=6`
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Weekday of a calendar date or local datetime
    pub fn of(date: &impl Datelike) -> Self {
        Self::ALL[date.weekday().num_days_from_sunday() as usize]
    }

    /// English name
    pub fn name(self) -> &'static str {
        match self {
            Self::Sunday => "Sunday",
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        crate::parse::parse_weekday(s)
    }
}

// ============================================================================
// Schedule Kind
// ============================================================================

/// Which of a group's two schedules an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Weekly template
    Days,
    /// Absolute-date overrides
    Dates,
}

impl ScheduleKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::Days => "days",
            ScheduleKind::Dates => "dates",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "days" | "day" => Ok(Self::Days),
            "dates" | "date" => Ok(Self::Dates),
            other => Err(format!("unknown schedule kind '{other}' (expected days or dates)")),
        }
    }
}

// ============================================================================
// Group
// ============================================================================

/// A routing group: its own timezone, default target and schedules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique, non-empty identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// IANA zone name the group's weekly template is written in
    pub timezone: String,

    /// Target used when no schedule entry is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
}

impl Group {
    /// Create a group without a default target
    pub fn new(id: impl Into<String>, name: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timezone: timezone.into(),
            default_target: None,
        }
    }

    /// Set the default target
    pub fn with_default_target(mut self, target: impl Into<String>) -> Self {
        self.default_target = Some(target.into());
        self
    }

    /// The group's timezone
    pub fn tz(&self) -> std::result::Result<Tz, ValidationError> {
        parse_timezone(&self.timezone)
    }

    /// The default target, if one is set and non-empty
    pub fn default_target(&self) -> Option<&str> {
        self.default_target.as_deref().filter(|t| !t.is_empty())
    }

    /// Check the record before it is stored
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyGroupId);
        }
        self.tz()?;
        Ok(())
    }
}

/// Parse an IANA zone name
pub fn parse_timezone(name: &str) -> std::result::Result<Tz, ValidationError> {
    name.parse::<Tz>()
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

// ============================================================================
// Day (weekly template entry)
// ============================================================================

/// A recurring weekly window, in the group's local time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    /// Owning group
    pub group: String,

    /// Day of the week the window starts on
    pub weekday: Weekday,

    /// Offset of the start from local midnight, in `[0, 24h)`
    #[serde(with = "duration_secs")]
    pub start: Duration,

    /// Length of the window, positive
    #[serde(with = "duration_secs")]
    pub duration: Duration,

    /// Where calls go while the window is active
    pub target: String,
}

impl Day {
    /// Create a validated weekly entry
    pub fn new(
        group: impl Into<String>,
        weekday: Weekday,
        start: Duration,
        duration: Duration,
        target: impl Into<String>,
    ) -> Result<Self> {
        let day = Self {
            group: group.into(),
            weekday,
            start,
            duration,
            target: target.into(),
        };
        day.validate()?;
        Ok(day)
    }

    /// Check the entry's invariants
    pub fn validate(&self) -> Result<()> {
        if self.group.is_empty() {
            return Err(ValidationError::EmptyGroupId.into());
        }
        if self.start < Duration::zero() || self.start >= Duration::hours(24) {
            return Err(ValidationError::StartOffsetOutOfRange(self.start.num_seconds()).into());
        }
        check_duration(self.duration)?;
        check_target(&self.target)
    }
}

// ============================================================================
// Date (override entry)
// ============================================================================

/// A one-off window anchored at an absolute instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    /// Owning group
    pub group: String,

    /// Start of the window
    pub start: DateTime<Utc>,

    /// Length of the window, positive
    #[serde(with = "duration_secs")]
    pub duration: Duration,

    /// Where calls go while the window is active
    pub target: String,
}

impl Date {
    /// Create a validated override entry
    pub fn new(
        group: impl Into<String>,
        start: DateTime<Utc>,
        duration: Duration,
        target: impl Into<String>,
    ) -> Result<Self> {
        let date = Self {
            group: group.into(),
            start,
            duration,
            target: target.into(),
        };
        date.validate()?;
        Ok(date)
    }

    /// Check the entry's invariants
    pub fn validate(&self) -> Result<()> {
        if self.group.is_empty() {
            return Err(ValidationError::EmptyGroupId.into());
        }
        check_duration(self.duration)?;
        check_target(&self.target)
    }

    /// End of the window
    pub fn stop(&self) -> DateTime<Utc> {
        self.start + self.duration
    }
}

fn check_duration(duration: Duration) -> Result<()> {
    if duration <= Duration::zero() {
        return Err(ValidationError::NonPositiveDuration(duration.num_seconds()).into());
    }
    Ok(())
}

fn check_target(target: &str) -> Result<()> {
    if target.is_empty() {
        return Err(Error::EmptyTarget);
    }
    Ok(())
}

// ============================================================================
// External row forms
// ============================================================================

/// A weekly template entry as it appears in an import feed or export.
///
/// Format: `group, weekday, start, stop, target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRow {
    pub group: String,
    pub day: String,
    pub start: String,
    pub stop: String,
    pub target: String,
}

/// A date override as it appears in an import feed or export.
///
/// Format: `group, YYYY-MM-DD, start, stop, target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRow {
    pub group: String,
    pub date: String,
    pub start: String,
    pub stop: String,
    pub target: String,
}

/// Number of columns in both feeds
pub const ROW_FIELDS: usize = 5;

fn split_record(record: &[String]) -> std::result::Result<[String; ROW_FIELDS], ValidationError> {
    let fields: [String; ROW_FIELDS] =
        record
            .to_vec()
            .try_into()
            .map_err(|_| ValidationError::FieldCount {
                expected: ROW_FIELDS,
                found: record.len(),
            })?;
    Ok(fields.map(|f| f.trim().to_string()))
}

impl DayRow {
    /// Build from a raw five-column record
    pub fn from_record(record: &[String]) -> std::result::Result<Self, ValidationError> {
        let [group, day, start, stop, target] = split_record(record)?;
        Ok(Self {
            group,
            day,
            start,
            stop,
            target,
        })
    }

    /// Columns in feed order
    pub fn to_record(&self) -> [&str; ROW_FIELDS] {
        [&self.group, &self.day, &self.start, &self.stop, &self.target]
    }
}

impl DateRow {
    /// Build from a raw five-column record
    pub fn from_record(record: &[String]) -> std::result::Result<Self, ValidationError> {
        let [group, date, start, stop, target] = split_record(record)?;
        Ok(Self {
            group,
            date,
            start,
            stop,
            target,
        })
    }

    /// Columns in feed order
    pub fn to_record(&self) -> [&str; ROW_FIELDS] {
        [&self.group, &self.date, &self.start, &self.stop, &self.target]
    }
}

/// Serialize a `chrono::Duration` as whole seconds
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("duration out of range: {secs}")))
    }
}
