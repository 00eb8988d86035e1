//! Composable SQL fragments and linear schema migrations for embedded, synchronous SQL
//! engines.
//!
//! Build queries from [`Fragment`]s with the [`sql!`] macro, flatten them into one
//! parameterized [`PreparedStatement`], run them through a [`StorageHandle`] with a
//! row-count contract ([`QueryExecutor`]), and advance a persisted schema version with a
//! [`MigrationRunner`].
//!
//! ```rust
//! # #[cfg(feature = "sqlite")]
//! # fn demo() -> Result<(), sql_fragment::SqlFragmentError> {
//! use sql_fragment::prelude::*;
//!
//! let mut db = SqliteHandle::open_in_memory()?;
//! MigrationRunner::new(vec![Migration::statements(
//!     "create_items",
//!     &["CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)"],
//! )])?
//! .run(&mut db)?;
//!
//! for label in ["a", "b", "c"] {
//!     db.none(sql!("INSERT INTO items (label) VALUES (" {label} ")"))?;
//! }
//! let wanted = Fragment::join(["a", "c"]);
//! let found = db.many(sql!("SELECT id FROM items WHERE label IN (" {wanted} ") ORDER BY id"))?;
//! assert_eq!(found.len(), 2);
//! # Ok(()) }
//! # #[cfg(feature = "sqlite")]
//! # demo().unwrap();
//! ```

pub mod coerce;
pub mod error;
pub mod executor;
pub mod flatten;
pub mod fragment;
pub mod host;
mod macros;
pub mod meta;
pub mod migrate;
pub mod prelude;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

pub use coerce::coerce;
pub use error::SqlFragmentError;
pub use executor::{CallShape, Mapped, Query, QueryExecutor, check_cardinality};
pub use flatten::{PlaceholderStyle, PreparedStatement, flatten, flatten_with};
pub use fragment::{Fragment, FragmentBuilder, Slot};
pub use host::StorageHandle;
pub use meta::MetadataTable;
pub use migrate::{Migration, MigrationReport, MigrationRunner, MigrationStatus};
pub use results::{DbRow, ResultSet};
pub use types::{ByteView, RowValues, Scalar};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteHandle};
