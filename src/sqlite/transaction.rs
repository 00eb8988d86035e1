use rusqlite::Connection;
use tracing::warn;

use crate::error::SqlFragmentError;

use super::connection::SqliteHandle;

const SAVEPOINT: &str = "sql_fragment_atomic";

/// Boundary opened by `run_atomic`: a real transaction at the top level, a savepoint when
/// one is already open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Transaction,
    Savepoint,
}

fn begin(conn: &Connection) -> Result<Scope, SqlFragmentError> {
    if conn.is_autocommit() {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Scope::Transaction)
    } else {
        conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))?;
        Ok(Scope::Savepoint)
    }
}

fn commit(conn: &Connection, scope: Scope) -> Result<(), SqlFragmentError> {
    match scope {
        Scope::Transaction => conn.execute_batch("COMMIT")?,
        Scope::Savepoint => conn.execute_batch(&format!("RELEASE {SAVEPOINT}"))?,
    }
    Ok(())
}

fn rollback(conn: &Connection, scope: Scope) -> Result<(), SqlFragmentError> {
    match scope {
        Scope::Transaction => conn.execute_batch("ROLLBACK")?,
        // ROLLBACK TO keeps the savepoint open, so release it as well
        Scope::Savepoint => conn.execute_batch(&format!(
            "ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}"
        ))?,
    }
    Ok(())
}

/// Run `f` inside a transaction (or nested savepoint) on `handle`.
///
/// # Errors
///
/// Returns `f`'s error after rolling back, or the engine's error from BEGIN/COMMIT.
pub(crate) fn run_atomic<T, F>(handle: &mut SqliteHandle, f: F) -> Result<T, SqlFragmentError>
where
    F: FnOnce(&mut SqliteHandle) -> Result<T, SqlFragmentError>,
{
    let scope = begin(handle.connection())?;
    match f(handle) {
        Ok(value) => {
            if let Err(err) = commit(handle.connection(), scope) {
                if let Err(rollback_err) = rollback(handle.connection(), scope) {
                    warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                return Err(err);
            }
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = rollback(handle.connection(), scope) {
                warn!(error = %rollback_err, ?scope, "rollback failed");
            }
            Err(err)
        }
    }
}
