//! Bulk replace pipeline
//!
//! Turns a row feed into Day or Date entries inside one write transaction.
//! The first time a batch touches a group, that group's whole schedule of
//! the imported kind is wiped; later rows for the same group append. Any
//! failure after the first row rolls the whole batch back.
//!
//! Row handling, in order:
//!
//! 1. Wrong column count or unparseable fields: on row 1 the row is taken
//!    for a header and skipped, on any later row the import aborts.
//! 2. Empty target: the row is skipped, wherever it appears.
//! 3. Unknown group: the import aborts.
//! 4. First row for a group: wipe that group's schedule, then store.

use std::collections::HashSet;
use std::io;

use serde::{Deserialize, Serialize};

use super::date::{put_date, DateSpec};
use super::day::put_day;
use crate::directory::find_group;
use crate::error::{Error, Result};
use crate::models::{Day, DateRow, DayRow, Group, ScheduleKind};
use crate::store::{Bucket, SharedStore, StoreExt, WriteTxn};

/// Outcome of a committed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Records read
    pub rows: usize,
    /// Entries stored
    pub imported: usize,
    /// Rows skipped for an empty target
    pub skipped: usize,
    /// Whether the first row was skipped as a header
    pub header_skipped: bool,
    /// Groups whose schedule was replaced, in first-seen order
    pub groups: Vec<String>,
}

/// A row that parsed, before its group is checked
enum Entry {
    Day(Day),
    Date(DateSpec),
}

impl Entry {
    fn parse(kind: ScheduleKind, record: &[String]) -> Result<Option<Self>> {
        match kind {
            ScheduleKind::Days => {
                let row = DayRow::from_record(record)?;
                if row.target.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Self::Day(Day::from_row(&row)?)))
            }
            ScheduleKind::Dates => {
                let row = DateRow::from_record(record)?;
                if row.target.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Self::Date(DateSpec::from_row(&row)?)))
            }
        }
    }

    fn group(&self) -> &str {
        match self {
            Self::Day(day) => &day.group,
            Self::Date(spec) => &spec.group,
        }
    }

    fn store<T: WriteTxn + ?Sized>(self, txn: &mut T, group: &Group) -> Result<()> {
        match self {
            Self::Day(day) => put_day(txn, &day),
            Self::Date(spec) => {
                let date = spec.localize(&group.tz()?)?;
                put_date(txn, &date)
            }
        }
    }
}

/// Per-batch state: the report and the set of groups already wiped
struct Batch {
    kind: ScheduleKind,
    seen: HashSet<String>,
    report: ImportReport,
}

impl Batch {
    fn new(kind: ScheduleKind) -> Self {
        Self {
            kind,
            seen: HashSet::new(),
            report: ImportReport::default(),
        }
    }

    fn apply<T: WriteTxn + ?Sized>(
        &mut self,
        txn: &mut T,
        row: usize,
        record: &[String],
    ) -> Result<()> {
        self.report.rows += 1;

        let entry = match Entry::parse(self.kind, record) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.report.skipped += 1;
                tracing::debug!(row, "Skipping row with empty target");
                return Ok(());
            }
            Err(e) if row == 1 => {
                self.report.header_skipped = true;
                tracing::debug!(error = %e, "Treating first row as header");
                return Ok(());
            }
            Err(e) => {
                let group = record.first().map(|g| g.trim()).unwrap_or_default();
                return Err(Error::aborted_import(row, group, e));
            }
        };

        let group_id = entry.group().to_string();
        self.store(txn, entry, &group_id)
            .map_err(|e| Error::aborted_import(row, &group_id, e))
    }

    fn store<T: WriteTxn + ?Sized>(
        &mut self,
        txn: &mut T,
        entry: Entry,
        group_id: &str,
    ) -> Result<()> {
        let group = find_group(&*txn, group_id)?.ok_or_else(|| Error::group_not_found(group_id))?;

        if !self.seen.contains(group_id) {
            let removed = txn.delete_bucket(&Bucket::schedule(self.kind, group_id))?;
            tracing::info!(group = %group_id, kind = %self.kind, removed, "Replacing schedule");
            self.seen.insert(group_id.to_string());
            self.report.groups.push(group_id.to_string());
        }

        entry.store(txn, &group)?;
        self.report.imported += 1;
        Ok(())
    }
}

/// Runs row feeds into the store
#[derive(Clone)]
pub struct Importer {
    store: SharedStore,
}

impl Importer {
    /// Create an importer over `store`
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Replace weekly templates from `group, weekday, start, stop, target` rows
    pub fn import_days<I>(&self, records: I) -> Result<ImportReport>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        self.import(ScheduleKind::Days, records)
    }

    /// Replace date overrides from `group, YYYY-MM-DD, start, stop, target` rows
    pub fn import_dates<I>(&self, records: I) -> Result<ImportReport>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        self.import(ScheduleKind::Dates, records)
    }

    /// Run a whole feed in one write transaction. Nothing is committed
    /// unless every row is either stored or skipped.
    pub fn import<I>(&self, kind: ScheduleKind, records: I) -> Result<ImportReport>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let report = self.store.update(|txn| {
            let mut batch = Batch::new(kind);
            for (index, record) in records.into_iter().enumerate() {
                batch.apply(txn, index + 1, &record)?;
            }
            Ok(batch.report)
        });

        match &report {
            Ok(report) => tracing::info!(
                kind = %kind,
                rows = report.rows,
                imported = report.imported,
                skipped = report.skipped,
                groups = report.groups.len(),
                "Import committed"
            ),
            Err(e) => tracing::warn!(kind = %kind, error = %e, "Import rolled back"),
        }
        report
    }
}

/// Read every record of a CSV feed. The reader does no header handling
/// and accepts ragged rows; both are left to the pipeline.
pub fn read_csv_records<R: io::Read>(reader: R) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| Error::Io(io::Error::from(e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;
    use crate::parse::ValidationError;
    use crate::schedule::date::load_dates;
    use crate::schedule::day::load_days;
    use crate::store::tests::create_test_stores;
    use std::sync::Arc;

    fn records(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|f| f.to_string()).collect())
            .collect()
    }

    fn setup() -> Vec<(SharedStore, Importer)> {
        create_test_stores()
            .into_iter()
            .map(|store| {
                let store: SharedStore = Arc::from(store);
                let directory = Directory::new(Arc::clone(&store));
                directory
                    .put(&Group::new("g1", "Support", "US/Eastern").with_default_target("000"))
                    .unwrap();
                directory.put(&Group::new("g2", "Sales", "UTC")).unwrap();
                (Arc::clone(&store), Importer::new(store))
            })
            .collect()
    }

    fn targets(store: &SharedStore, group: &str) -> Vec<String> {
        store
            .view(|txn| load_days(txn, group))
            .unwrap()
            .into_iter()
            .map(|d| d.target)
            .collect()
    }

    #[test]
    fn test_header_row_is_skipped() {
        for (store, importer) in setup() {
            let report = importer
                .import_days(records(&[
                    &["group", "day", "start", "stop", "target"],
                    &["g1", "Mon", "02:00", "06:00", "111"],
                ]))
                .unwrap();

            assert!(report.header_skipped);
            assert_eq!(report.rows, 2);
            assert_eq!(report.imported, 1);
            assert_eq!(targets(&store, "g1"), vec!["111"]);
        }
    }

    #[test]
    fn test_empty_targets_are_skipped_anywhere() {
        for (store, importer) in setup() {
            let report = importer
                .import_days(records(&[
                    &["g1", "Mon", "02:00", "06:00", ""],
                    &["g1", "Tue", "02:00", "06:00", "222"],
                    &["g1", "Wed", "02:00", "06:00", "  "],
                ]))
                .unwrap();

            assert!(!report.header_skipped);
            assert_eq!(report.skipped, 2);
            assert_eq!(report.imported, 1);
            assert_eq!(targets(&store, "g1"), vec!["222"]);
        }
    }

    #[test]
    fn test_malformed_later_row_aborts() {
        for (store, importer) in setup() {
            importer
                .import_days(records(&[&["g1", "Mon", "02:00", "06:00", "111"]]))
                .unwrap();

            let err = importer
                .import_days(records(&[
                    &["g1", "Tue", "02:00", "06:00", "222"],
                    &["g1", "Funday", "02:00", "06:00", "333"],
                ]))
                .unwrap_err();

            match &err {
                Error::AbortedImport { row, group, .. } => {
                    assert_eq!(*row, 2);
                    assert_eq!(group, "g1");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(matches!(
                err.root(),
                Error::Validation(ValidationError::InvalidWeekday(_))
            ));

            // Prior state untouched
            assert_eq!(targets(&store, "g1"), vec!["111"]);
        }
    }

    #[test]
    fn test_wrong_column_count_aborts() {
        for (_, importer) in setup() {
            let err = importer
                .import_days(records(&[
                    &["g1", "Mon", "02:00", "06:00", "111"],
                    &["g1", "Tue", "02:00", "222"],
                ]))
                .unwrap_err();
            assert!(matches!(
                err.root(),
                Error::Validation(ValidationError::FieldCount { found: 4, .. })
            ));
        }
    }

    #[test]
    fn test_unknown_group_aborts() {
        for (store, importer) in setup() {
            let err = importer
                .import_days(records(&[
                    &["g1", "Mon", "02:00", "06:00", "111"],
                    &["ghost", "Mon", "02:00", "06:00", "999"],
                ]))
                .unwrap_err();

            assert!(err.root().is_not_found());
            assert!(targets(&store, "g1").is_empty());
        }
    }

    #[test]
    fn test_reimport_replaces_only_touched_groups() {
        for (store, importer) in setup() {
            importer
                .import_days(records(&[
                    &["g1", "Mon", "02:00", "06:00", "111"],
                    &["g1", "Tue", "02:00", "06:00", "112"],
                    &["g2", "Mon", "09:00", "17:00", "211"],
                ]))
                .unwrap();

            let report = importer
                .import_days(records(&[
                    &["g1", "Fri", "09:00", "17:00", "151"],
                    &["g1", "Sat", "09:00", "17:00", "161"],
                ]))
                .unwrap();

            assert_eq!(report.groups, vec!["g1"]);
            assert_eq!(targets(&store, "g1"), vec!["151", "161"]);
            assert_eq!(targets(&store, "g2"), vec!["211"]);
        }
    }

    #[test]
    fn test_same_key_last_row_wins() {
        for (store, importer) in setup() {
            importer
                .import_days(records(&[
                    &["g1", "Mon", "02:00", "06:00", "first"],
                    &["g1", "monday", "02:00", "04:00", "second"],
                ]))
                .unwrap();
            assert_eq!(targets(&store, "g1"), vec!["second"]);
        }
    }

    #[test]
    fn test_import_dates_in_group_timezone() {
        for (store, importer) in setup() {
            let report = importer
                .import_dates(records(&[
                    &["group", "date", "start", "stop", "target"],
                    &["g1", "2016-02-13", "02:00", "06:00", "411"],
                ]))
                .unwrap();
            assert_eq!(report.imported, 1);

            let dates = store.view(|txn| load_dates(txn, "g1")).unwrap();
            assert_eq!(dates.len(), 1);
            assert_eq!(dates[0].start.to_rfc3339(), "2016-02-13T07:00:00+00:00");
        }
    }

    #[test]
    fn test_dates_import_leaves_days_alone() {
        for (store, importer) in setup() {
            importer
                .import_days(records(&[&["g1", "Mon", "02:00", "06:00", "111"]]))
                .unwrap();
            importer
                .import_dates(records(&[&["g1", "2016-02-13", "02:00", "06:00", "411"]]))
                .unwrap();
            assert_eq!(targets(&store, "g1"), vec!["111"]);
        }
    }

    #[test]
    fn test_read_csv_records() {
        let data = "group,day,start,stop,target\ng1, Mon ,02:00,06:00,111\n\ng1,Tue,02:00\n";
        let rows = read_csv_records(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["g1", "Mon", "02:00", "06:00", "111"]);
        assert_eq!(rows[2].len(), 3);
    }
}
