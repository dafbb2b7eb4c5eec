//! Temporal schedule resolution
//!
//! Answers one question: which target is active for group G at instant T?
//! Each group carries a weekly template (Day entries, local wall time) and
//! a set of absolute-date overrides (Date entries), plus a default target.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Resolver                             │
//! │        Date override  >  Day template  >  Default            │
//! └──────┬───────────────────────┬───────────────────────┬───────┘
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//! ┌─────────────┐        ┌──────────────┐        ┌─────────────┐
//! │ dates/<g>   │        │  days/<g>    │        │   groups    │
//! │ UTC instant │        │ "w:mmmm" key │        │  directory  │
//! │   keys      │        │ wraps weekly │        │             │
//! └─────────────┘        └──────────────┘        └─────────────┘
//!        ▲                       ▲
//!        └───────────┬───────────┘
//!                    │
//!            ┌───────┴───────┐
//!            │   Importer    │  wipe on first touch, one transaction
//!            └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`day`] - Weekly template keys and the split wraparound scan
//! - [`date`] - Date override keys and scan
//! - [`resolver`] - Priority resolution within one read transaction
//! - [`import`] - Bulk replace pipeline for row feeds
//! - [`export`] - Dump a group's schedules back to row form

pub mod date;
pub mod day;
pub mod export;
pub mod import;
pub mod resolver;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::parse::ValidationError;

pub use export::{export, ScheduleDump};
pub use import::{read_csv_records, ImportReport, Importer};
pub use resolver::{Resolution, ResolutionSource, Resolver};

/// How window boundary instants are treated.
///
/// A window runs from its start to `start + duration`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Boundary {
    /// `start < t < stop`
    #[default]
    Open,
    /// `start <= t < stop`
    HalfOpen,
    /// `start <= t <= stop`
    Closed,
}

impl Boundary {
    /// Whether `t` lies within the window `[start, stop]` under this policy
    pub fn contains(self, start: DateTime<Utc>, stop: DateTime<Utc>, t: DateTime<Utc>) -> bool {
        match self {
            Self::Open => start < t && t < stop,
            Self::HalfOpen => start <= t && t < stop,
            Self::Closed => start <= t && t <= stop,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::HalfOpen => "half-open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Boundary {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "half-open" | "half_open" | "halfopen" => Ok(Self::HalfOpen),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown boundary policy '{other}'")),
        }
    }
}

/// Longest accepted lookback. Six days keeps a weekly scan from wrapping
/// onto itself.
pub const MAX_LOOKBACK_HOURS: i64 = 144;

/// Parameters of a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    boundary: Boundary,
    lookback: Duration,
}

impl ResolveOptions {
    /// Create options, rejecting a lookback outside `(0, 144h]`
    pub fn new(boundary: Boundary, lookback: Duration) -> Result<Self> {
        if lookback <= Duration::zero() || lookback > Duration::hours(MAX_LOOKBACK_HOURS) {
            return Err(ValidationError::LookbackOutOfRange(lookback.num_seconds()).into());
        }
        Ok(Self { boundary, lookback })
    }

    /// Boundary policy for window membership
    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    /// Entries starting more than this long before the instant are not
    /// considered
    pub fn lookback(&self) -> Duration {
        self.lookback
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            boundary: Boundary::Open,
            lookback: Duration::hours(48),
        }
    }
}

/// Place a wall time in a timezone. A time repeated by a DST fall-back
/// maps to its first occurrence; a time skipped by a spring-forward gives
/// `None`.
pub(crate) fn localize(tz: &Tz, wall: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&wall) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// First instant of a local calendar day. Some zones skip midnight on a
/// DST change day; the day then starts an hour later.
pub(crate) fn local_midnight(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    (0..=1).find_map(|hour| localize(tz, date.and_hms_opt(hour, 0, 0)?))
}
