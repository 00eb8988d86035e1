//! Issuing fragments against a [`StorageHandle`] and shaping the returned rows.

use std::fmt;

use tracing::debug;

use crate::error::SqlFragmentError;
use crate::flatten::flatten;
use crate::fragment::Fragment;
use crate::host::StorageHandle;
use crate::results::{DbRow, ResultSet};

/// Row-count contract of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// Exactly one row.
    One,
    /// Zero or one row.
    MaybeOne,
    /// Any number of rows.
    Many,
    /// No rows.
    None,
}

impl CallShape {
    /// Human-readable expectation used in cardinality errors.
    #[must_use]
    pub fn expected(self) -> &'static str {
        match self {
            CallShape::One => "exactly 1",
            CallShape::MaybeOne => "at most 1",
            CallShape::Many => "any number of",
            CallShape::None => "0",
        }
    }

    #[must_use]
    pub fn accepts(self, rows: usize) -> bool {
        match self {
            CallShape::One => rows == 1,
            CallShape::MaybeOne => rows <= 1,
            CallShape::Many => true,
            CallShape::None => rows == 0,
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallShape::One => "exactly-one",
            CallShape::MaybeOne => "zero-or-one",
            CallShape::Many => "many",
            CallShape::None => "none",
        };
        f.write_str(name)
    }
}

/// Check a raw row count against a call shape.
///
/// # Errors
///
/// Returns `SqlFragmentError::Cardinality` with the expected and actual counts.
pub fn check_cardinality(shape: CallShape, actual: usize) -> Result<(), SqlFragmentError> {
    if shape.accepts(actual) {
        Ok(())
    } else {
        Err(SqlFragmentError::Cardinality {
            shape,
            expected: shape.expected(),
            actual,
        })
    }
}

/// Something that can be issued against a handle: a fragment plus the mapper applied to
/// each returned row.
pub trait Query {
    type Output;
    type Mapper: FnMut(DbRow) -> Result<Self::Output, SqlFragmentError>;

    fn into_query(self) -> (Fragment, Self::Mapper);
}

impl Query for Fragment {
    type Output = DbRow;
    type Mapper = fn(DbRow) -> Result<DbRow, SqlFragmentError>;

    fn into_query(self) -> (Fragment, Self::Mapper) {
        let identity: Self::Mapper = Ok;
        (self, identity)
    }
}

/// A fragment with a row mapper attached; see [`Fragment::map_rows`].
pub struct Mapped<F> {
    fragment: Fragment,
    mapper: F,
}

impl<F> Mapped<F> {
    pub(crate) fn new(fragment: Fragment, mapper: F) -> Self {
        Self { fragment, mapper }
    }
}

impl<F> fmt::Debug for Mapped<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapped")
            .field("fragment", &self.fragment)
            .finish_non_exhaustive()
    }
}

impl<F, T> Query for Mapped<F>
where
    F: FnMut(DbRow) -> Result<T, SqlFragmentError>,
{
    type Output = T;
    type Mapper = F;

    fn into_query(self) -> (Fragment, F) {
        (self.fragment, self.mapper)
    }
}

fn fetch_shaped<H, Q>(
    handle: &mut H,
    query: Q,
    shape: CallShape,
) -> Result<(Vec<DbRow>, Q::Mapper), SqlFragmentError>
where
    H: StorageHandle + ?Sized,
    Q: Query,
{
    let (fragment, mapper) = query.into_query();
    let statement = flatten(fragment);
    debug!(
        sql = statement.text(),
        params = statement.parameters().len(),
        %shape,
        "executing fragment"
    );
    let result_set = handle.execute_statement(&statement)?;
    // counted before mapping so errors reflect what the engine returned
    check_cardinality(shape, result_set.len())?;
    Ok((result_set.into_rows(), mapper))
}

/// Call shapes over any [`StorageHandle`].
///
/// ```rust
/// # #[cfg(feature = "sqlite")]
/// # fn demo() -> Result<(), sql_fragment::SqlFragmentError> {
/// use sql_fragment::prelude::*;
///
/// let mut db = SqliteHandle::open_in_memory()?;
/// db.none(sql!("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)"))?;
/// db.none(sql!("INSERT INTO t (id, name) VALUES (" {1} ", " {"one"} ")"))?;
///
/// let name = db.one(
///     sql!("SELECT name FROM t WHERE id = " {1})
///         .map_rows(|row| Ok(row.get("name").and_then(|v| v.as_text()).map(str::to_owned))),
/// )?;
/// assert_eq!(name.as_deref(), Some("one"));
/// assert!(db.maybe_one(sql!("SELECT name FROM t WHERE id = " {2}))?.is_none());
/// # Ok(()) }
/// # #[cfg(feature = "sqlite")]
/// # demo().unwrap();
/// ```
pub trait QueryExecutor: StorageHandle {
    /// Flatten and run a fragment, returning the raw result set with its counters.
    ///
    /// # Errors
    ///
    /// Returns the host's rejection if the statement fails.
    fn fetch(&mut self, fragment: Fragment) -> Result<ResultSet, SqlFragmentError> {
        let statement = flatten(fragment);
        debug!(
            sql = statement.text(),
            params = statement.parameters().len(),
            "executing fragment"
        );
        self.execute_statement(&statement)
    }

    /// Exactly one row.
    ///
    /// # Errors
    ///
    /// `Cardinality` when the statement returns zero or several rows, the host's rejection,
    /// or the mapper's error.
    fn one<Q: Query>(&mut self, query: Q) -> Result<Q::Output, SqlFragmentError> {
        let (rows, mut mapper) = fetch_shaped(self, query, CallShape::One)?;
        match rows.into_iter().next() {
            Some(row) => mapper(row),
            None => Err(SqlFragmentError::ExecutionError(
                "row vanished after cardinality check".into(),
            )),
        }
    }

    /// Zero or one row.
    ///
    /// # Errors
    ///
    /// `Cardinality` when the statement returns two or more rows, the host's rejection, or
    /// the mapper's error.
    fn maybe_one<Q: Query>(&mut self, query: Q) -> Result<Option<Q::Output>, SqlFragmentError> {
        let (rows, mut mapper) = fetch_shaped(self, query, CallShape::MaybeOne)?;
        rows.into_iter().next().map(&mut mapper).transpose()
    }

    /// All rows, possibly none.
    ///
    /// # Errors
    ///
    /// The host's rejection or the first mapper error.
    fn many<Q: Query>(&mut self, query: Q) -> Result<Vec<Q::Output>, SqlFragmentError> {
        let (rows, mut mapper) = fetch_shaped(self, query, CallShape::Many)?;
        rows.into_iter().map(&mut mapper).collect()
    }

    /// No rows; for DDL and writes without `RETURNING`.
    ///
    /// # Errors
    ///
    /// `Cardinality` when the statement returns any row, or the host's rejection.
    fn none<Q: Query>(&mut self, query: Q) -> Result<(), SqlFragmentError> {
        fetch_shaped(self, query, CallShape::None).map(|_| ())
    }

    /// Pass-through to the host's scoped transaction.
    ///
    /// # Errors
    ///
    /// Whatever `f` or the host transaction returns.
    fn atomic<T, F>(&mut self, f: F) -> Result<T, SqlFragmentError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, SqlFragmentError>,
    {
        self.run_atomic(f)
    }
}

impl<H: StorageHandle + ?Sized> QueryExecutor for H {}
