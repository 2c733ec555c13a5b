//! Error types for schema and documentation lookups.

use crate::types::Namespace;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the schema and documentation stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No schema data exists for the requested version.
    #[error("OCSF schema version {0} not found")]
    VersionNotFound(String),

    /// The version exists but has no class or object with that name.
    #[error("{kind} '{name}' not found in OCSF schema version {version}")]
    EntityNotFound {
        kind: Namespace,
        name: String,
        version: String,
    },

    /// A documentation file is absent from the docs root.
    #[error("Documentation file not found: {0}")]
    DocNotFound(String),

    /// Stored schema data exists but cannot be parsed.
    #[error("Failed to parse OCSF schema for version {version}: {reason}")]
    MalformedSchema { version: String, reason: String },

    /// Every known version was excluded by the stability filter.
    #[error("No stable OCSF versions found")]
    NoStableVersion,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the "something is absent" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound(_) | Self::EntityNotFound { .. } | Self::DocNotFound(_)
        )
    }
}
