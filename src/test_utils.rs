//! In-memory [`StorageHandle`] for exercising fragments and migrations without an engine.
//!
//! `RecordingHandle` records every statement, answers from scripted result sets, and keeps
//! the metadata relation in a map so the migration runner can be driven end to end.
//!
//! Placeholders are counted as `?` and `$N` outside quoted literals and identifiers, and the
//! count must equal the parameter count. Comments are not skipped, so a `?` inside a
//! `--` or `/* */` comment still counts.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::error::SqlFragmentError;
use crate::host::StorageHandle;
use crate::results::{DbRow, ResultSet};
use crate::types::RowValues;

/// One statement as the host received it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Vec<RowValues>,
}

/// Build a scripted result set.
#[must_use]
pub fn rows(columns: &[&str], values: Vec<Vec<RowValues>>) -> ResultSet {
    let mut rs = ResultSet::with_columns(columns.iter().map(|c| (*c).to_owned()).collect());
    for row in values {
        rs.add_row_values(row);
    }
    rs
}

/// Build a single standalone row.
#[must_use]
pub fn row(columns: &[&str], values: Vec<RowValues>) -> DbRow {
    DbRow::new(
        Arc::new(columns.iter().map(|c| (*c).to_owned()).collect()),
        values,
    )
}

#[derive(Debug, Default)]
pub struct RecordingHandle {
    executed: Vec<ExecutedStatement>,
    responses: VecDeque<ResultSet>,
    rejections: Vec<String>,
    meta_table: Option<String>,
    meta: BTreeMap<String, RowValues>,
    commits: usize,
    rollbacks: usize,
}

impl RecordingHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result returned by the next non-metadata statement.
    pub fn respond_with(&mut self, result_set: ResultSet) {
        self.responses.push_back(result_set);
    }

    /// Reject every statement whose text contains `needle`.
    pub fn reject_matching(&mut self, needle: impl Into<String>) {
        self.rejections.push(needle.into());
    }

    #[must_use]
    pub fn executed(&self) -> &[ExecutedStatement] {
        &self.executed
    }

    #[must_use]
    pub fn meta_value(&self, key: &str) -> Option<&RowValues> {
        self.meta.get(key)
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    fn meta_statement(&mut self, sql: &str, params: &[RowValues]) -> Option<ResultSet> {
        if let Some(name) = sql
            .strip_prefix("CREATE TABLE IF NOT EXISTS ")
            .and_then(|rest| rest.strip_suffix(" (key TEXT PRIMARY KEY, value)"))
        {
            self.meta_table = Some(name.to_owned());
            return Some(ResultSet::default());
        }
        if self.meta_table.is_none() {
            return None;
        }
        let key = match params.first() {
            Some(RowValues::Text(key)) => key.clone(),
            _ => return None,
        };
        if sql.starts_with("SELECT value FROM ") && sql.ends_with(" WHERE key = ?") {
            let mut rs = ResultSet::with_columns(vec!["value".to_owned()]);
            if let Some(value) = self.meta.get(&key) {
                rs.add_row_values(vec![value.clone()]);
            }
            return Some(rs);
        }
        if sql.starts_with("INSERT INTO ") && sql.contains("ON CONFLICT(key) DO UPDATE") {
            let value = params.get(1).cloned().unwrap_or(RowValues::Null);
            self.meta.insert(key, value);
            return Some(ResultSet::written(1));
        }
        None
    }
}

/// Count `?` and `$N` placeholders outside `'...'`, `"..."` and `` `...` `` quoting.
fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            // doubled quotes inside a literal toggle out and straight back in
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '?' => count += 1,
                '$' if chars.peek().is_some_and(char::is_ascii_digit) => count += 1,
                _ => {}
            },
        }
    }
    count
}

impl StorageHandle for RecordingHandle {
    fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlFragmentError> {
        self.executed.push(ExecutedStatement {
            sql: sql.to_owned(),
            params: params.to_vec(),
        });
        if let Some(needle) = self.rejections.iter().find(|n| sql.contains(n.as_str())) {
            return Err(SqlFragmentError::HostRejection(format!(
                "statement rejected ({needle}): {sql}"
            )));
        }
        let placeholders = count_placeholders(sql);
        if placeholders != params.len() {
            return Err(SqlFragmentError::HostRejection(format!(
                "{placeholders} placeholders but {} parameters",
                params.len()
            )));
        }
        if let Some(rs) = self.meta_statement(sql, params) {
            return Ok(rs);
        }
        Ok(self.responses.pop_front().unwrap_or_default())
    }

    fn has_table(&mut self, name: &str) -> Result<bool, SqlFragmentError> {
        Ok(self.meta_table.as_deref() == Some(name))
    }

    fn run_atomic<T, F>(&mut self, f: F) -> Result<T, SqlFragmentError>
    where
        F: FnOnce(&mut Self) -> Result<T, SqlFragmentError>,
    {
        let snapshot = (self.meta_table.clone(), self.meta.clone());
        match f(self) {
            Ok(value) => {
                self.commits += 1;
                Ok(value)
            }
            Err(err) => {
                (self.meta_table, self.meta) = snapshot;
                self.rollbacks += 1;
                Err(err)
            }
        }
    }
}
