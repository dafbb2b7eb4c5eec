//! ringroute - time-based call routing
//!
//! Resolves, for a routing group and an instant, which target a call
//! should be sent to. Each group has a weekly template in its own timezone,
//! a set of one-off date overrides that take precedence, and a default
//! target.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`directory`] - Group CRUD
//! - [`schedule`] - Resolution, bulk import and export of schedules
//! - [`store`] - Ordered key-value store (in-memory and SQLite)
//! - [`models`] - Core data structures and types
//! - [`parse`] - Weekday, time and date tokens from import rows
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use ringroute::config::Config;
//! use ringroute::directory::Directory;
//! use ringroute::models::Group;
//! use ringroute::schedule::{Importer, Resolver};
//! use ringroute::store::open_store;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = open_store(&config.database)?;
//!
//!     Directory::new(store.clone())
//!         .put(&Group::new("g1", "Support", "US/Eastern").with_default_target("000"))?;
//!     Importer::new(store.clone()).import_days(vec![vec![
//!         "g1".into(), "Mon".into(), "02:00".into(), "06:00".into(), "111".into(),
//!     ]])?;
//!
//!     let resolver = Resolver::with_options(store, config.resolve_options()?);
//!     println!("{}", resolver.resolve_now("g1")?.target);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod parse;
pub mod schedule;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::directory::Directory;
    pub use crate::error::{Error, ErrorCategory, Result, RouteErrorTrait};
    pub use crate::models::{Date, Day, Group, ScheduleKind, Weekday};
    pub use crate::schedule::{Boundary, ImportReport, Importer, Resolution, Resolver};
    pub use crate::store::{open_store, SharedStore};
}

// Direct re-exports for convenience
pub use models::{Date, Day, Group, Weekday};
