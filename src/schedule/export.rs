//! Dump a group's schedules in import row form

use serde::{Deserialize, Serialize};

use super::date::load_dates;
use super::day::load_days;
use crate::directory::get_group;
use crate::error::Result;
use crate::models::{DateRow, DayRow, Group, ScheduleKind, ROW_FIELDS};
use crate::store::{SharedStore, StoreExt};

/// A group and both of its schedules, read from one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDump {
    pub group: Group,
    pub days: Vec<DayRow>,
    pub dates: Vec<DateRow>,
}

impl ScheduleDump {
    /// Rows of one schedule kind, in feed column order
    pub fn records(&self, kind: ScheduleKind) -> Vec<[&str; ROW_FIELDS]> {
        match kind {
            ScheduleKind::Days => self.days.iter().map(DayRow::to_record).collect(),
            ScheduleKind::Dates => self.dates.iter().map(DateRow::to_record).collect(),
        }
    }
}

/// Export `group_id`. Day rows come in weekday order, Date rows oldest
/// first, with dates shown in the group's timezone.
pub fn export(store: &SharedStore, group_id: &str) -> Result<ScheduleDump> {
    store.view(|txn| {
        let group = get_group(txn, group_id)?;
        let tz = group.tz()?;

        let days = load_days(txn, &group.id)?.iter().map(|d| d.to_row()).collect();
        let dates = load_dates(txn, &group.id)?
            .iter()
            .map(|d| d.to_row(&tz))
            .collect();

        Ok(ScheduleDump { group, days, dates })
    })
}
