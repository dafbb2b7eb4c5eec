use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use ringroute::config::Config;
use ringroute::schedule::Resolver;

/// Parse an RFC 3339 instant, e.g. `2016-02-13T03:00:00-05:00`
fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let at = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid instant '{raw}', expected RFC 3339"))?;
    Ok(at.with_timezone(&Utc))
}

pub fn resolve(config: &Config, group: &str, at: Option<&str>) -> Result<()> {
    let at = match at {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };

    let resolver = Resolver::with_options(super::store(config)?, config.resolve_options()?);
    tracing::debug!(
        boundary = %resolver.options().boundary(),
        lookback_hours = resolver.options().lookback().num_hours(),
        "Resolving"
    );
    let resolution = resolver.resolve(group, at)?;

    tracing::info!(
        group = %group,
        at = %at,
        source = %resolution.source,
        "Target resolved"
    );
    println!("{}", resolution.target);
    Ok(())
}
