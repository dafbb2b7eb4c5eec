use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use ringroute::config::Config;
use ringroute::models::ScheduleKind;
use ringroute::schedule::{read_csv_records, Importer};

pub fn import(config: &Config, kind: ScheduleKind, file: &Path) -> Result<()> {
    let reader = File::open(file)
        .with_context(|| format!("Failed to open feed: {}", file.display()))?;
    let records = read_csv_records(reader)
        .with_context(|| format!("Failed to read CSV feed: {}", file.display()))?;

    let importer = Importer::new(super::store(config)?);
    let report = importer.import(kind, records)?;

    println!("Imported {kind} from {}", file.display());
    println!("  Rows: {}", report.rows);
    println!("  Entries stored: {}", report.imported);
    println!("  Skipped (empty target): {}", report.skipped);
    if report.header_skipped {
        println!("  Header row skipped");
    }
    println!("  Groups replaced: {}", report.groups.join(", "));
    Ok(())
}
