//! Weekly template matching
//!
//! Day entries are keyed `"<weekday 0-6>:<minutes 0000-1439>"`, so keys
//! sort by weekday and then by start minute. Resolution scans only the
//! keys that fall inside the lookback window ending at the local instant.
//! The key space wraps at the end of Saturday, so a window that crosses
//! the week boundary becomes two scans: `[from, WEEK_MAX]` then
//! `[WEEK_MIN, to]`.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use super::{local_midnight, localize, Boundary, ResolveOptions};
use crate::error::Result;
use crate::models::{Day, DayRow, Weekday};
use crate::parse::{
    format_time_of_day, parse_time_of_day, parse_weekday, span_between, stop_time_of_day,
};
use crate::store::{Bucket, ReadTxn, WriteTxn};

/// Lowest possible Day key
pub const WEEK_MIN: &str = "0:0000";

/// Sorts after every Day key
pub const WEEK_MAX: &str = "6:1440";

/// Key for a weekday and a minute of the day
pub fn day_key(weekday: Weekday, minutes: i64) -> String {
    format!("{}:{:04}", weekday.ordinal(), minutes)
}

/// Key ranges to scan for `from..=to`, split in two when the range wraps
/// past the end of the week
pub fn scan_ranges(from: String, to: String) -> Vec<(String, String)> {
    if from <= to {
        vec![(from, to)]
    } else {
        vec![
            (from, WEEK_MAX.to_string()),
            (WEEK_MIN.to_string(), to),
        ]
    }
}

/// Wall-clock and elapsed minutes since local midnight. They differ by up
/// to an hour on DST change days.
fn minutes_into_day(tz: &Tz, at: DateTime<Utc>) -> (Weekday, i64, i64) {
    let local = at.with_timezone(tz);
    let wall = i64::from(local.time().num_seconds_from_midnight() / 60);
    let elapsed = local_midnight(tz, local.date_naive())
        .map(|midnight| at.signed_duration_since(midnight).num_minutes())
        .unwrap_or(wall);
    (Weekday::of(&local), wall, elapsed)
}

/// Inclusive key bounds for entries starting within `lookback` before `at`
pub fn scan_bounds(tz: &Tz, at: DateTime<Utc>, lookback: Duration) -> (String, String) {
    let (from_day, from_wall, from_elapsed) = minutes_into_day(tz, at - lookback);
    let (to_day, to_wall, to_elapsed) = minutes_into_day(tz, at);
    (
        day_key(from_day, from_wall.min(from_elapsed)),
        day_key(to_day, to_wall.max(to_elapsed)),
    )
}

impl Day {
    /// Store key of this entry
    pub fn key(&self) -> String {
        day_key(self.weekday, self.start.num_minutes())
    }

    /// Convert an import row
    pub fn from_row(row: &DayRow) -> Result<Self> {
        let weekday = parse_weekday(&row.day)?;
        let start = parse_time_of_day(&row.start)?;
        let stop = parse_time_of_day(&row.stop)?;
        let duration = span_between(start, stop)?;
        Day::new(row.group.clone(), weekday, start, duration, row.target.clone())
    }

    /// Render as an import row
    pub fn to_row(&self) -> DayRow {
        DayRow {
            group: self.group.clone(),
            day: self.weekday.name().to_string(),
            start: format_time_of_day(self.start),
            stop: format_time_of_day(stop_time_of_day(self.start, self.duration)),
            target: self.target.clone(),
        }
    }

    /// Start of the most recent occurrence of this entry at or before `at`.
    ///
    /// Today counts only if its start has already passed; otherwise walk
    /// back a day at a time to the previous matching weekday.
    pub fn last_start(&self, tz: &Tz, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = at.with_timezone(tz).date_naive();

        if Weekday::of(&today) == self.weekday {
            if let Some(start) = self.start_on(tz, today) {
                if start <= at {
                    return Some(start);
                }
            }
        }

        (1..=7)
            .filter_map(|back| today.checked_sub_signed(Duration::days(back)))
            .find(|date| Weekday::of(date) == self.weekday)
            .and_then(|date| self.start_on(tz, date))
    }

    fn start_on(&self, tz: &Tz, date: chrono::NaiveDate) -> Option<DateTime<Utc>> {
        let wall = date.and_time(NaiveTime::MIN) + self.start;
        // A start inside a spring-forward gap counts from midnight instead
        localize(tz, wall).or_else(|| local_midnight(tz, date).map(|m| m + self.start))
    }

    /// Whether the most recent occurrence of this entry covers `at`
    pub fn active_at(&self, tz: &Tz, at: DateTime<Utc>, boundary: Boundary) -> bool {
        self.last_start(tz, at)
            .is_some_and(|start| boundary.contains(start, start + self.duration, at))
    }
}

/// Find the Day entry of `group` active at `at`. The first match in key
/// order wins.
pub fn active_day<T: ReadTxn + ?Sized>(
    txn: &T,
    group: &str,
    tz: &Tz,
    at: DateTime<Utc>,
    options: &ResolveOptions,
) -> Result<Option<Day>> {
    let bucket = Bucket::days(group);
    let (from, to) = scan_bounds(tz, at, options.lookback);

    for (from, to) in scan_ranges(from, to) {
        for (key, value) in txn.range(&bucket, from.as_bytes(), to.as_bytes())? {
            let day: Day = serde_json::from_slice(&value)?;
            if day.group != group {
                continue;
            }
            if day.active_at(tz, at, options.boundary) {
                tracing::debug!(
                    group = %group,
                    key = %String::from_utf8_lossy(&key),
                    target = %day.target,
                    "Day entry active"
                );
                return Ok(Some(day));
            }
        }
    }

    Ok(None)
}

/// Store a Day entry, replacing any entry with the same key
pub fn put_day<T: WriteTxn + ?Sized>(txn: &mut T, day: &Day) -> Result<()> {
    let value = serde_json::to_vec(day)?;
    txn.put(&Bucket::days(&day.group), day.key().as_bytes(), &value)?;
    Ok(())
}

/// All Day entries of a group, in key order
pub fn load_days<T: ReadTxn + ?Sized>(txn: &T, group: &str) -> Result<Vec<Day>> {
    txn.scan(&Bucket::days(group))?
        .into_iter()
        .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreExt};
    use chrono::TimeZone;
    use chrono_tz::{US::Eastern, UTC};

    fn day(weekday: Weekday, start_h: i64, hours: i64, target: &str) -> Day {
        Day::new(
            "g1",
            weekday,
            Duration::hours(start_h),
            Duration::hours(hours),
            target,
        )
        .unwrap()
    }

    fn utc(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 2, d, h, m, s).unwrap()
    }

    fn store_with(days: &[Day]) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .update(|txn| {
                for d in days {
                    put_day(txn, d)?;
                }
                Ok(())
            })
            .unwrap();
        store
    }

    fn find(store: &MemoryStore, tz: &Tz, at: DateTime<Utc>, options: ResolveOptions) -> Option<String> {
        store
            .view(|txn| active_day(txn, "g1", tz, at, &options))
            .unwrap()
            .map(|d| d.target)
    }

    #[test]
    fn test_day_key_sorts_by_weekday_then_minute() {
        assert_eq!(day(Weekday::Monday, 2, 4, "111").key(), "1:0120");
        assert_eq!(day_key(Weekday::Saturday, 1380), "6:1380");
        assert!(day_key(Weekday::Sunday, 1439) < day_key(Weekday::Monday, 0));
        assert!(day_key(Weekday::Monday, 60) < day_key(Weekday::Monday, 600));
        assert!(WEEK_MIN <= day_key(Weekday::Sunday, 0).as_str());
        assert!(WEEK_MAX > day_key(Weekday::Saturday, 1439).as_str());
    }

    #[test]
    fn test_scan_ranges_split_on_wrap() {
        assert_eq!(
            scan_ranges("1:0120".into(), "3:0120".into()),
            vec![("1:0120".to_string(), "3:0120".to_string())]
        );
        assert_eq!(
            scan_ranges("5:0060".into(), "0:0060".into()),
            vec![
                ("5:0060".to_string(), WEEK_MAX.to_string()),
                (WEEK_MIN.to_string(), "0:0060".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_bounds_in_group_timezone() {
        // Monday 2016-02-15 08:00Z is 03:00 EST
        let (from, to) = scan_bounds(&Eastern, utc(15, 8, 0, 0), Duration::hours(48));
        assert_eq!(from, "6:0180");
        assert_eq!(to, "1:0180");
    }

    #[test]
    fn test_window_boundaries_are_open() {
        let entry = day(Weekday::Monday, 2, 4, "111");
        // 02:00-06:00 EST on Monday 2016-02-15 is 07:00Z-11:00Z
        assert!(!entry.active_at(&Eastern, utc(15, 7, 0, 0), Boundary::Open));
        assert!(entry.active_at(&Eastern, utc(15, 7, 0, 1), Boundary::Open));
        assert!(entry.active_at(&Eastern, utc(15, 10, 59, 59), Boundary::Open));
        assert!(!entry.active_at(&Eastern, utc(15, 11, 0, 0), Boundary::Open));

        assert!(entry.active_at(&Eastern, utc(15, 7, 0, 0), Boundary::HalfOpen));
        assert!(entry.active_at(&Eastern, utc(15, 11, 0, 0), Boundary::Closed));
    }

    #[test]
    fn test_last_start_walks_back_to_previous_week() {
        let entry = day(Weekday::Monday, 2, 4, "111");
        // Monday 01:00 UTC: today's 02:00 has not happened yet
        let start = entry.last_start(&UTC, utc(15, 1, 0, 0)).unwrap();
        assert_eq!(start, utc(8, 2, 0, 0));

        let start = entry.last_start(&UTC, utc(15, 3, 0, 0)).unwrap();
        assert_eq!(start, utc(15, 2, 0, 0));
    }

    #[test]
    fn test_saturday_window_covers_sunday_morning() {
        let store = store_with(&[day(Weekday::Saturday, 22, 4, "sat-night")]);
        let options = ResolveOptions::default();

        // Sunday 2016-02-14 01:00 UTC
        assert_eq!(
            find(&store, &UTC, utc(14, 1, 0, 0), options),
            Some("sat-night".to_string())
        );
        assert_eq!(find(&store, &UTC, utc(14, 2, 0, 0), options), None);
    }

    #[test]
    fn test_lookback_limits_long_windows() {
        // Friday 00:00 for 72 hours, queried Sunday 12:00: 60h after start
        let store = store_with(&[day(Weekday::Friday, 0, 72, "weekend")]);
        let at = utc(14, 12, 0, 0);

        assert_eq!(find(&store, &UTC, at, ResolveOptions::default()), None);

        let wide = ResolveOptions {
            lookback: Duration::hours(72),
            ..ResolveOptions::default()
        };
        assert_eq!(find(&store, &UTC, at, wide), Some("weekend".to_string()));
    }

    #[test]
    fn test_first_match_in_key_order() {
        let store = store_with(&[
            day(Weekday::Monday, 1, 4, "early"),
            day(Weekday::Monday, 2, 4, "late"),
        ]);
        assert_eq!(
            find(&store, &UTC, utc(15, 3, 0, 0), ResolveOptions::default()),
            Some("early".to_string())
        );
    }

    #[test]
    fn test_entries_of_other_groups_are_skipped() {
        let store = MemoryStore::new();
        let foreign = Day::new("g2", Weekday::Monday, Duration::hours(2), Duration::hours(4), "222")
            .unwrap();
        store
            .update(|txn| {
                let value = serde_json::to_vec(&foreign)?;
                txn.put(&Bucket::days("g1"), foreign.key().as_bytes(), &value)?;
                Ok(())
            })
            .unwrap();

        assert_eq!(
            find(&store, &UTC, utc(15, 3, 0, 0), ResolveOptions::default()),
            None
        );
    }

    #[test]
    fn test_spring_forward_day_uses_wall_time() {
        // Sunday 2016-03-13: clocks jump from 02:00 EST to 03:00 EDT
        let entry = day(Weekday::Sunday, 3, 2, "dst");
        let start = entry
            .last_start(&Eastern, Utc.with_ymd_and_hms(2016, 3, 13, 8, 0, 0).unwrap())
            .unwrap();
        // 03:00 EDT
        assert_eq!(start, Utc.with_ymd_and_hms(2016, 3, 13, 7, 0, 0).unwrap());

        let store = store_with(&[entry]);
        assert_eq!(
            find(
                &store,
                &Eastern,
                Utc.with_ymd_and_hms(2016, 3, 13, 8, 30, 0).unwrap(),
                ResolveOptions::default()
            ),
            Some("dst".to_string())
        );
    }

    #[test]
    fn test_start_in_dst_gap_counts_from_midnight() {
        // 02:30 does not exist on 2016-03-13 in US/Eastern; midnight is 05:00Z
        let entry = Day::new(
            "g1",
            Weekday::Sunday,
            Duration::minutes(150),
            Duration::hours(1),
            "gap",
        )
        .unwrap();
        let start = entry
            .last_start(&Eastern, Utc.with_ymd_and_hms(2016, 3, 13, 9, 0, 0).unwrap())
            .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2016, 3, 13, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_fall_back_second_pass_still_finds_entry() {
        // Sunday 2016-11-06: 01:00-02:00 happens twice. The entry starts at
        // the first 01:30 (05:30Z); 06:15Z is 01:15 EST on the second pass,
        // so its wall minute (75) sorts before the entry key (90).
        let entry = Day::new(
            "g1",
            Weekday::Sunday,
            Duration::minutes(90),
            Duration::hours(2),
            "fb",
        )
        .unwrap();
        let at = Utc.with_ymd_and_hms(2016, 11, 6, 6, 15, 0).unwrap();

        let (_, to) = scan_bounds(&Eastern, at, Duration::hours(48));
        assert_eq!(to, "0:0135");

        let store = store_with(&[entry]);
        assert_eq!(
            find(&store, &Eastern, at, ResolveOptions::default()),
            Some("fb".to_string())
        );
    }

    #[test]
    fn test_spring_forward_lookback_start_uses_elapsed_minutes() {
        // 02:30 is skipped on 2016-03-13 and counts from midnight: 07:30Z.
        // The lookback starts at 07:20Z, 03:20 EDT on the wall but only
        // 140 minutes after midnight.
        let entry = Day::new(
            "g1",
            Weekday::Sunday,
            Duration::minutes(150),
            Duration::hours(1),
            "gap",
        )
        .unwrap();
        let at = Utc.with_ymd_and_hms(2016, 3, 13, 8, 20, 0).unwrap();
        let options = ResolveOptions::new(Boundary::Open, Duration::hours(1)).unwrap();

        let (from, _) = scan_bounds(&Eastern, at, options.lookback());
        assert_eq!(from, "0:0140");

        let store = store_with(&[entry]);
        assert_eq!(find(&store, &Eastern, at, options), Some("gap".to_string()));
    }

    #[test]
    fn test_row_conversion() {
        let row = DayRow {
            group: "g1".into(),
            day: "sat".into(),
            start: "22:00".into(),
            stop: "02:00".into(),
            target: "111".into(),
        };
        let entry = Day::from_row(&row).unwrap();
        assert_eq!(entry.weekday, Weekday::Saturday);
        assert_eq!(entry.duration, Duration::hours(4));

        let back = entry.to_row();
        assert_eq!(back.day, "Saturday");
        assert_eq!(back.stop, "02:00");
        assert_eq!(Day::from_row(&back).unwrap(), entry);
    }

    #[test]
    fn test_load_days_in_key_order() {
        let store = store_with(&[
            day(Weekday::Friday, 9, 8, "fri"),
            day(Weekday::Monday, 9, 8, "mon"),
        ]);
        let days = store.view(|txn| load_days(txn, "g1")).unwrap();
        let targets: Vec<_> = days.iter().map(|d| d.target.as_str()).collect();
        assert_eq!(targets, vec!["mon", "fri"]);
    }
}
