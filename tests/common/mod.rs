//! Common test utilities

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::US::Eastern;
use ringroute::config::DatabaseConfig;
use ringroute::directory::Directory;
use ringroute::models::Group;
use ringroute::store::{MemoryStore, SharedStore, SqliteStore};
use tempfile::TempDir;

/// One store per backend. The `TempDir` keeps the SQLite file alive.
pub fn create_test_stores() -> Vec<(SharedStore, Option<TempDir>)> {
    let dir = TempDir::new().unwrap();
    let sqlite = SqliteStore::open(dir.path().join("routes.db")).unwrap();
    vec![
        (Arc::new(MemoryStore::new()) as SharedStore, None),
        (Arc::new(sqlite) as SharedStore, Some(dir)),
    ]
}

/// Store with group `g1` (US/Eastern, default target "000")
pub fn store_with_g1(store: &SharedStore) {
    Directory::new(Arc::clone(store))
        .put(&Group::new("g1", "Support", "US/Eastern").with_default_target("000"))
        .unwrap();
}

/// Build raw records from string slices
pub fn records(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|f| f.to_string()).collect())
        .collect()
}

/// A wall time in US/Eastern as a UTC instant
pub fn eastern(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Eastern
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

/// SQLite database config pointing into a temp directory
#[allow(dead_code)]
pub fn sqlite_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        backend: ringroute::config::StoreBackend::Sqlite,
        path: dir.path().join("ringroute.db"),
    }
}
