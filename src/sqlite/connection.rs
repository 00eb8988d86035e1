use std::fmt;
use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::SqlFragmentError;
use crate::host::StorageHandle;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::params::Params;
use super::query::build_result_set;
use super::transaction;

/// [`StorageHandle`] over a single rusqlite connection.
pub struct SqliteHandle {
    conn: Connection,
}

impl SqliteHandle {
    /// Open (or create) a database file with default settings.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::SqliteError` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqlFragmentError> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::SqliteError` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqlFragmentError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Borrow the underlying connection for engine-specific calls.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    #[must_use]
    pub fn into_inner(self) -> Connection {
        self.conn
    }

    /// True while a transaction opened through `run_atomic` (or by hand) is in progress.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Run a batch of `;`-separated statements without parameters.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::SqliteError` if any statement fails.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SqlFragmentError> {
        debug!(sql, "executing batch");
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

impl fmt::Debug for SqliteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteHandle")
            .field("path", &self.conn.path())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl StorageHandle for SqliteHandle {
    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFragmentError> {
        let converted = Params::convert(params);
        // changes() keeps the last DML count across DDL, so diff the running total instead
        let before = self.conn.total_changes();
        let mut result_set = {
            let mut stmt = self.conn.prepare(sql)?;
            build_result_set(&mut stmt, converted.as_values())?
        };
        let written = self.conn.total_changes().saturating_sub(before);
        result_set.rows_written = usize::try_from(written).unwrap_or(usize::MAX);
        Ok(result_set)
    }

    fn has_table(&mut self, name: &str) -> Result<bool, SqlFragmentError> {
        let found = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?
            .exists([name])?;
        Ok(found)
    }

    fn run_atomic<T, F>(&mut self, f: F) -> Result<T, SqlFragmentError>
    where
        F: FnOnce(&mut Self) -> Result<T, SqlFragmentError>,
    {
        transaction::run_atomic(self, f)
    }
}
