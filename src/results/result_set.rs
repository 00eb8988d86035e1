use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DbRow, index_columns};
use crate::types::RowValues;

/// What the storage engine returned for one statement.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the statement
    pub results: Vec<DbRow>,
    /// Number of rows the statement returned
    pub rows_read: usize,
    /// Number of rows the statement inserted, updated or deleted
    pub rows_written: usize,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Empty result set for a statement with the given result columns.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            results: Vec::new(),
            rows_read: 0,
            rows_written: 0,
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Result set carrying only a write count.
    #[must_use]
    pub fn written(rows_written: usize) -> Self {
        Self {
            rows_written,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Add a row sharing this result set's column metadata.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.results.push(DbRow::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            row_values,
        ));
        self.rows_read += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<DbRow> {
        self.results
    }
}
