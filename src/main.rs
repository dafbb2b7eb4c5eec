use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ringroute::config::Config;
use ringroute::error::{Error as RouteError, RouteErrorTrait};
use ringroute::models::ScheduleKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "ringroute",
    version,
    about = "Time-based call routing: weekly templates, date overrides and default targets",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configuration
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage routing groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Replace schedules from a CSV feed
    Import {
        /// Feed type (days, dates)
        kind: ScheduleKind,

        /// CSV file: group, weekday or YYYY-MM-DD, start, stop, target
        file: PathBuf,
    },

    /// Print the target a group routes to at an instant
    Resolve {
        /// Group identifier
        group: String,

        /// Instant in RFC 3339 form (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Dump a group's schedules
    Export {
        /// Group identifier
        group: String,

        /// Output format (json, csv)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Only this schedule (days, dates); csv output defaults to days
        #[arg(short, long)]
        kind: Option<ScheduleKind>,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    /// Create or update a group
    Put {
        /// Group identifier (a UUID is generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Display name
        #[arg(long)]
        name: String,

        /// IANA timezone name
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Target used when no schedule entry is active
        #[arg(long)]
        default_target: Option<String>,
    },

    /// Show one group
    Get {
        /// Group identifier
        id: String,
    },

    /// List all groups
    List,

    /// Delete a group and its schedules
    Delete {
        /// Group identifier
        id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::debug!(
        backend = ?config.database.backend,
        path = %config.database.path.display(),
        boundary = %config.resolution.boundary,
        lookback_hours = config.resolution.lookback_hours,
        "Configuration loaded"
    );

    if let Err(err) = run(cli.command, &config) {
        if let Some((category, recoverable)) = classify(&err) {
            tracing::error!(category, recoverable, error = %err, "Command failed");
        }
        return Err(err);
    }

    Ok(())
}

/// Category and retry hint of a failure raised by the routing engine
fn classify(err: &anyhow::Error) -> Option<(&'static str, bool)> {
    err.downcast_ref::<RouteError>()
        .map(|e| (e.category().description(), e.is_recoverable()))
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Group { action } => match action {
            GroupAction::Put {
                id,
                name,
                timezone,
                default_target,
            } => commands::group::put(config, id, name, timezone, default_target)?,
            GroupAction::Get { id } => commands::group::get(config, &id)?,
            GroupAction::List => commands::group::list(config)?,
            GroupAction::Delete { id } => commands::group::delete(config, &id)?,
        },

        Commands::Import { kind, file } => {
            tracing::info!(kind = %kind, file = %file.display(), "Starting import command");
            commands::import(config, kind, &file)?;
        }

        Commands::Resolve { group, at } => {
            commands::resolve(config, &group, at.as_deref())?;
        }

        Commands::Export {
            group,
            format,
            kind,
        } => {
            commands::export(config, &group, &format, kind)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("ringroute=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("ringroute={level},warn"))?
    };

    // stdout carries command output
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_engine_errors() {
        let err = anyhow::Error::from(RouteError::group_not_found("g9"));
        assert_eq!(classify(&err), Some(("not found", false)));

        let err = anyhow::Error::from(RouteError::group_not_found("g9")).context("resolve failed");
        assert_eq!(classify(&err), Some(("not found", false)));

        assert_eq!(classify(&anyhow::anyhow!("bad flag")), None);
    }
}
