//! Resolution priority: Date override, then Day template, then the
//! group's default target. All lookups of one resolution share a single
//! read transaction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{date, day, ResolveOptions};
use crate::directory::get_group;
use crate::error::{Error, Result};
use crate::store::{ReadTxn, SharedStore, StoreExt};

/// Which rule produced a resolved target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Date,
    Day,
    Default,
}

impl ResolutionSource {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Day => "day",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The answer to "where do calls for this group go right now"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub group: String,
    pub target: String,
    pub source: ResolutionSource,
}

/// Resolve inside an existing read transaction
pub fn resolve_in<T: ReadTxn + ?Sized>(
    txn: &T,
    group_id: &str,
    at: DateTime<Utc>,
    options: &ResolveOptions,
) -> Result<Resolution> {
    let group = get_group(txn, group_id)?;
    let tz = group.tz()?;

    let found = |target: String, source| Resolution {
        group: group.id.clone(),
        target,
        source,
    };

    if let Some(date) = date::active_date(txn, &group.id, at, options)? {
        return Ok(found(date.target, ResolutionSource::Date));
    }

    if let Some(day) = day::active_day(txn, &group.id, &tz, at, options)? {
        return Ok(found(day.target, ResolutionSource::Day));
    }

    if let Some(target) = group.default_target() {
        return Ok(found(target.to_string(), ResolutionSource::Default));
    }

    Err(Error::target_not_found(&group.id))
}

/// Resolves targets against a shared store
#[derive(Clone)]
pub struct Resolver {
    store: SharedStore,
    options: ResolveOptions,
}

impl Resolver {
    /// Create a resolver with the default policy
    pub fn new(store: SharedStore) -> Self {
        Self::with_options(store, ResolveOptions::default())
    }

    /// Create a resolver with explicit options
    pub fn with_options(store: SharedStore, options: ResolveOptions) -> Self {
        Self { store, options }
    }

    /// Current options
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve the active target of `group_id` at `at`
    pub fn resolve(&self, group_id: &str, at: DateTime<Utc>) -> Result<Resolution> {
        let resolution = self
            .store
            .view(|txn| resolve_in(txn, group_id, at, &self.options))?;

        tracing::debug!(
            group = %group_id,
            at = %at,
            target = %resolution.target,
            source = %resolution.source,
            "Resolved"
        );
        Ok(resolution)
    }

    /// Resolve the active target of `group_id` now
    pub fn resolve_now(&self, group_id: &str) -> Result<Resolution> {
        self.resolve(group_id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;
    use crate::models::{Date, Day, Group, Weekday};
    use crate::schedule::Boundary;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn setup(default_target: Option<&str>) -> (SharedStore, Resolver) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut group = Group::new("g1", "Support", "UTC");
        group.default_target = default_target.map(str::to_string);
        Directory::new(Arc::clone(&store)).put(&group).unwrap();
        let resolver = Resolver::new(Arc::clone(&store));
        (store, resolver)
    }

    fn monday(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 2, 15, h, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_group() {
        let (_, resolver) = setup(Some("000"));
        let err = resolver.resolve("nope", monday(3)).unwrap_err();
        assert!(matches!(err, Error::NotFound(crate::error::NotFound::Group(_))));
    }

    #[test]
    fn test_default_then_not_found() {
        let (_, resolver) = setup(Some("000"));
        let resolution = resolver.resolve("g1", monday(3)).unwrap();
        assert_eq!(resolution.target, "000");
        assert_eq!(resolution.source, ResolutionSource::Default);

        let (_, resolver) = setup(None);
        let err = resolver.resolve("g1", monday(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound(crate::error::NotFound::Target { .. })
        ));
    }

    #[test]
    fn test_options_apply_to_resolution() {
        let (store, _) = setup(None);
        let weekly = Day::new("g1", Weekday::Monday, Duration::hours(2), Duration::hours(4), "111")
            .unwrap();
        store.update(|txn| day::put_day(txn, &weekly)).unwrap();

        let closed = ResolveOptions::new(Boundary::Closed, Duration::hours(48)).unwrap();
        let resolver = Resolver::with_options(Arc::clone(&store), closed);
        assert_eq!(resolver.options(), &closed);
        assert_eq!(resolver.resolve("g1", monday(2)).unwrap().target, "111");

        let err = Resolver::new(store).resolve("g1", monday(2)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_date_beats_day() {
        let (store, resolver) = setup(Some("000"));
        let weekly = Day::new("g1", Weekday::Monday, Duration::hours(2), Duration::hours(4), "111")
            .unwrap();
        let special = Date::new("g1", monday(1), Duration::hours(4), "411").unwrap();
        store
            .update(|txn| {
                day::put_day(txn, &weekly)?;
                date::put_date(txn, &special)
            })
            .unwrap();

        let resolution = resolver.resolve("g1", monday(3)).unwrap();
        assert_eq!(resolution.target, "411");
        assert_eq!(resolution.source, ResolutionSource::Date);

        // Override over, template still running
        let later = Utc.with_ymd_and_hms(2016, 2, 15, 5, 30, 0).unwrap();
        let resolution = resolver.resolve("g1", later).unwrap();
        assert_eq!(resolution.target, "111");
        assert_eq!(resolution.source, ResolutionSource::Day);
    }
}
