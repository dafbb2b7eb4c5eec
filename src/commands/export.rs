use std::io;

use anyhow::Result;

use ringroute::config::Config;
use ringroute::models::ScheduleKind;
use ringroute::schedule::{self, ScheduleDump};

pub fn export(config: &Config, group: &str, format: &str, kind: Option<ScheduleKind>) -> Result<()> {
    let mut dump = schedule::export(&super::store(config)?, group)?;

    match format {
        "json" => {
            match kind {
                Some(ScheduleKind::Days) => dump.dates.clear(),
                Some(ScheduleKind::Dates) => dump.days.clear(),
                None => {}
            }
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
        "csv" => write_csv(&dump, kind.unwrap_or(ScheduleKind::Days), io::stdout())?,
        other => anyhow::bail!("Unsupported export format: {other} (expected json or csv)"),
    }

    tracing::debug!(
        group = %group,
        days = dump.days.len(),
        dates = dump.dates.len(),
        "Schedule exported"
    );
    Ok(())
}

fn write_csv<W: io::Write>(dump: &ScheduleDump, kind: ScheduleKind, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for record in dump.records(kind) {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}
