use thiserror::Error;

use crate::executor::CallShape;

#[derive(Debug, Error)]
pub enum SqlFragmentError {
    /// The `SQLite` engine rejected the statement (malformed SQL, constraint, bad PRAGMA, ...).
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// A non-`SQLite` host rejected the statement.
    #[error("Host rejected statement: {0}")]
    HostRejection(String),

    #[error("Cardinality error: {shape} query expected {expected} row(s), got {actual}")]
    Cardinality {
        shape: CallShape,
        expected: &'static str,
        actual: usize,
    },

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Migration step {name:?} (version {version}) failed: {source}")]
    MigrationStep {
        name: String,
        version: u32,
        #[source]
        source: Box<SqlFragmentError>,
    },

    #[error("Schema version {found} is ahead of the {known} known migration(s)")]
    SchemaAhead { found: u32, known: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}

impl SqlFragmentError {
    #[must_use]
    pub fn is_cardinality(&self) -> bool {
        matches!(self, Self::Cardinality { .. })
    }

    /// True when the storage engine itself refused the statement.
    #[must_use]
    pub fn is_host_rejection(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Self::SqliteError(_) => true,
            Self::HostRejection(_) => true,
            _ => false,
        }
    }

    /// Name and target version of the failed migration step, if this is a step failure.
    #[must_use]
    pub fn migration_step(&self) -> Option<(&str, u32)> {
        match self {
            Self::MigrationStep { name, version, .. } => Some((name.as_str(), *version)),
            _ => None,
        }
    }

    /// Strip the migration annotation and return the error the step actually raised.
    #[must_use]
    pub fn into_cause(self) -> SqlFragmentError {
        match self {
            Self::MigrationStep { source, .. } => *source,
            other => other,
        }
    }
}
