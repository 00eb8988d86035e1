//! Fragment construction, the shaped executor calls and the migration runner in one import.
//!
//! ```rust
//! use sql_fragment::prelude::*;
//!
//! let stmt = flatten(sql!("SELECT 1 WHERE " {true} " = " {"true"}));
//! assert_eq!(stmt.text(), "SELECT 1 WHERE ? = ?");
//! ```

pub use crate::sql;
pub use crate::{
    ByteView, CallShape, DbRow, Fragment, Migration, MigrationReport, MigrationRunner,
    MigrationStatus, PlaceholderStyle, PreparedStatement, QueryExecutor, ResultSet, RowValues,
    Scalar, SqlFragmentError, StorageHandle, coerce, flatten, flatten_with,
};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{JournalMode, SqliteConfig, SqliteHandle};
