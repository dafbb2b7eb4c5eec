pub mod export;
pub mod group;
pub mod import;
pub mod resolve;

// Re-export command functions for convenience
pub use export::export;
pub use import::import;
pub use resolve::resolve;

use anyhow::{Context, Result};
use ringroute::config::Config;
use ringroute::store::{open_store, SharedStore};

/// Open the configured store
pub(crate) fn store(config: &Config) -> Result<SharedStore> {
    open_store(&config.database).with_context(|| {
        format!(
            "Failed to open {:?} store at {}",
            config.database.backend,
            config.database.path.display()
        )
    })
}
