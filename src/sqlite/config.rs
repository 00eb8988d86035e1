use std::time::Duration;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::SqlFragmentError;

use super::connection::SqliteHandle;

pub const MEMORY_PATH: &str = ":memory:";

/// `SQLite` journal modes accepted by `PRAGMA journal_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// Options applied when opening a [`SqliteHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: String,
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: bool,
    pub journal_mode: Option<JournalMode>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: MEMORY_PATH.to_owned(),
            busy_timeout: None,
            foreign_keys: true,
            journal_mode: None,
        }
    }
}

impl SqliteConfig {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    /// Open the database and apply the configured pragmas.
    ///
    /// # Errors
    ///
    /// Returns `SqlFragmentError::SqliteError` if the file cannot be opened or a pragma is
    /// rejected.
    pub fn open(&self) -> Result<SqliteHandle, SqlFragmentError> {
        let conn = if self.is_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&self.path)?
        };
        self.apply(&conn)?;
        Ok(SqliteHandle::from_connection(conn))
    }

    fn apply(&self, conn: &Connection) -> Result<(), SqlFragmentError> {
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)?;
        if let Some(mode) = self.journal_mode {
            conn.execute_batch(&format!("PRAGMA journal_mode = {};", mode.as_str()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_memory_with_foreign_keys() {
        let cfg = SqliteConfig::default();
        assert!(cfg.is_memory());
        assert!(cfg.foreign_keys);
        assert!(cfg.journal_mode.is_none());
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: SqliteConfig =
            serde_json::from_str(r#"{"path": "app.db", "journal_mode": "wal"}"#).unwrap();
        assert_eq!(cfg.path, "app.db");
        assert_eq!(cfg.journal_mode, Some(JournalMode::Wal));
        assert!(cfg.foreign_keys);
    }

    #[test]
    fn opens_in_memory_with_pragmas() {
        let handle = SqliteConfig::in_memory()
            .with_busy_timeout(Duration::from_millis(250))
            .with_journal_mode(JournalMode::Memory)
            .open()
            .unwrap();
        let fk: i64 = handle
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
