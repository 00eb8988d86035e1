//! The storage capability this crate runs against.

use crate::error::SqlFragmentError;
use crate::flatten::PreparedStatement;
use crate::results::ResultSet;
use crate::types::RowValues;

/// A synchronous, SQL-capable storage handle.
///
/// Implemented by [`SqliteHandle`](crate::sqlite::SqliteHandle) for a real database and by
/// `RecordingHandle` (feature `test-utils`) for tests. Calls block until the engine is done;
/// `&mut self` keeps one caller on a handle at a time.
pub trait StorageHandle {
    /// Run one statement with positional parameters.
    ///
    /// # Errors
    ///
    /// Returns the host's rejection unmodified when the engine refuses the statement.
    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFragmentError>;

    /// Whether a table called `name` exists. Must not create or change anything, so it is
    /// safe on read-only connections.
    ///
    /// # Errors
    ///
    /// Returns the host's rejection if the catalog cannot be read.
    fn has_table(&mut self, name: &str) -> Result<bool, SqlFragmentError>;

    /// Run `f` as one all-or-nothing unit: committed if it returns `Ok`, rolled back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or the host's error if the transaction cannot be
    /// opened or committed.
    fn run_atomic<T, F>(&mut self, f: F) -> Result<T, SqlFragmentError>
    where
        F: FnOnce(&mut Self) -> Result<T, SqlFragmentError>;

    /// Run a flattened statement.
    ///
    /// # Errors
    ///
    /// Same as [`StorageHandle::execute`].
    fn execute_statement(
        &mut self,
        statement: &PreparedStatement,
    ) -> Result<ResultSet, SqlFragmentError> {
        self.execute(statement.text(), statement.parameters())
    }
}
