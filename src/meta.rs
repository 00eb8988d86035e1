//! Generic key→value metadata relation holding the schema version.

use crate::error::SqlFragmentError;
use crate::executor::QueryExecutor;
use crate::fragment::Fragment;
use crate::host::StorageHandle;
use crate::types::{RowValues, Scalar};

pub const DEFAULT_METADATA_TABLE: &str = "_meta";
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// The `(key TEXT PRIMARY KEY, value)` relation, created on first write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataTable {
    name: &'static str,
}

impl Default for MetadataTable {
    fn default() -> Self {
        Self {
            name: DEFAULT_METADATA_TABLE,
        }
    }
}

impl MetadataTable {
    /// Use a custom relation name.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::ConfigError` unless `name` is a plain identifier
    /// (ASCII letters, digits and `_`, not starting with a digit).
    pub fn new(name: &'static str) -> Result<Self, SqlFragmentError> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SqlFragmentError::ConfigError(format!(
                "invalid metadata table name {name:?}"
            )));
        }
        Ok(Self { name })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Create the relation if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns the host's rejection if the DDL fails.
    pub fn ensure<H: StorageHandle + ?Sized>(&self, handle: &mut H) -> Result<(), SqlFragmentError> {
        handle.none(
            Fragment::builder()
                .sql("CREATE TABLE IF NOT EXISTS ")
                .sql(self.name)
                .sql(" (key TEXT PRIMARY KEY, value)")
                .build(),
        )
    }

    /// Read the value stored under `key`; `None` when the relation does not exist yet.
    ///
    /// Issues no DDL, so it works on read-only connections.
    ///
    /// # Errors
    ///
    /// Returns the host's rejection, or `Cardinality` if the relation is corrupt.
    pub fn get<H: StorageHandle + ?Sized>(
        &self,
        handle: &mut H,
        key: &str,
    ) -> Result<Option<RowValues>, SqlFragmentError> {
        if !handle.has_table(self.name)? {
            return Ok(None);
        }
        let query = Fragment::builder()
            .sql("SELECT value FROM ")
            .sql(self.name)
            .sql(" WHERE key = ")
            .push(key)
            .build()
            .map_rows(|row| Ok(row.into_values().into_iter().next().unwrap_or(RowValues::Null)));
        handle.maybe_one(query)
    }

    /// Insert or overwrite the value stored under `key`, creating the relation first if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns the host's rejection if the upsert fails.
    pub fn set<H: StorageHandle + ?Sized>(
        &self,
        handle: &mut H,
        key: &str,
        value: impl Into<Scalar>,
    ) -> Result<(), SqlFragmentError> {
        let value: Scalar = value.into();
        self.ensure(handle)?;
        handle.none(
            Fragment::builder()
                .sql("INSERT INTO ")
                .sql(self.name)
                .sql(" (key, value) VALUES (")
                .push(key)
                .sql(", ")
                .push(value)
                .sql(") ON CONFLICT(key) DO UPDATE SET value = excluded.value")
                .build(),
        )
    }

    /// Persisted schema version; 0 when never written or the relation is missing.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::ExecutionError` if the stored value is not a non-negative
    /// integer, or the host's rejection.
    pub fn schema_version<H: StorageHandle + ?Sized>(
        &self,
        handle: &mut H,
    ) -> Result<u32, SqlFragmentError> {
        match self.get(handle, SCHEMA_VERSION_KEY)? {
            None | Some(RowValues::Null) => Ok(0),
            Some(RowValues::Int(v)) => u32::try_from(v).map_err(|_| invalid_version(&v)),
            Some(RowValues::Text(s)) => s.trim().parse::<u32>().map_err(|_| invalid_version(&s)),
            Some(other) => Err(invalid_version(&other)),
        }
    }

    /// Persist the schema version.
    ///
    /// # Errors
    ///
    /// Returns the host's rejection if the upsert fails.
    pub fn set_schema_version<H: StorageHandle + ?Sized>(
        &self,
        handle: &mut H,
        version: u32,
    ) -> Result<(), SqlFragmentError> {
        self.set(handle, SCHEMA_VERSION_KEY, version)
    }
}

fn invalid_version(value: &dyn std::fmt::Debug) -> SqlFragmentError {
    SqlFragmentError::ExecutionError(format!(
        "stored {SCHEMA_VERSION_KEY} is not a valid version: {value:?}"
    ))
}
