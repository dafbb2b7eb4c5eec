//! Unified error handling for the ringroute crate
//!
//! Domain-specific errors ([`ValidationError`] from row parsing,
//! [`StoreError`] from the storage backends) are wrapped by a single
//! [`Error`] enum so that every public operation returns the same
//! [`Result`] type.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ringroute::error::{Error, ErrorCategory, RouteErrorTrait};
//!
//! match resolver.resolve("sales", now) {
//!     Ok(resolution) => println!("{}", resolution.target),
//!     Err(Error::NotFound(what)) => eprintln!("nothing to route to: {what}"),
//!     Err(err) if err.is_recoverable() => retry(),
//!     Err(err) => return Err(err),
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::parse::ValidationError;
pub use crate::store::StoreError;

/// Common trait for ringroute error types
pub trait RouteErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the operation may be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A group or an active target does not exist
    NotFound,
    /// Malformed input: time, weekday, date, field count, timezone
    Validation,
    /// Store failures and record encoding
    Storage,
    /// A bulk import was rolled back
    Import,
    /// Configuration errors
    Config,
}

impl ErrorCategory {
    /// Short description of the category
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Validation => "invalid input",
            Self::Storage => "storage failure",
            Self::Import => "import aborted",
            Self::Config => "configuration error",
        }
    }
}

/// What a [`Error::NotFound`] refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// No group with this identifier
    Group(String),
    /// The group exists but nothing is active and it has no default target
    Target { group: String },
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(id) => write!(f, "group '{id}'"),
            Self::Target { group } => write!(f, "active target for group '{group}'"),
        }
    }
}

/// Unified error type for the ringroute crate
#[derive(Error, Debug)]
pub enum Error {
    /// Group or target absent
    #[error("Not found: {0}")]
    NotFound(NotFound),

    /// Malformed row, token or record field
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A row carried no target. Imports skip such rows; it is never
    /// returned from an import.
    #[error("Empty target")]
    EmptyTarget,

    /// Record encoding/decoding errors
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Underlying store failure
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// A bulk import failed on a row and nothing was committed
    #[error("Import aborted at row {row} (group '{group}'): {source}")]
    AbortedImport {
        row: usize,
        group: String,
        #[source]
        source: Box<Error>,
    },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RouteErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Persistence(e) => e.is_recoverable(),
            Self::AbortedImport { source, .. } => source.is_recoverable(),
            Self::Io(_) => true,
            Self::NotFound(_)
            | Self::Validation(_)
            | Self::EmptyTarget
            | Self::Codec(_)
            | Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Validation(_) | Self::EmptyTarget => ErrorCategory::Validation,
            Self::Codec(_) | Self::Persistence(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::AbortedImport { .. } => ErrorCategory::Import,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a group-not-found error
    pub fn group_not_found(id: impl Into<String>) -> Self {
        Self::NotFound(NotFound::Group(id.into()))
    }

    /// Create a no-active-target error
    pub fn target_not_found(group: impl Into<String>) -> Self {
        Self::NotFound(NotFound::Target {
            group: group.into(),
        })
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a row failure into an aborted import
    pub fn aborted_import(row: usize, group: impl Into<String>, source: Error) -> Self {
        Self::AbortedImport {
            row,
            group: group.into(),
            source: Box::new(source),
        }
    }

    /// Whether this is a not-found signal rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The innermost error of an aborted import, or `self`
    pub fn root(&self) -> &Error {
        match self {
            Self::AbortedImport { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
