// SQLite host - runs flattened statements on a rusqlite connection
//
// - config: open-time options (path, busy timeout, pragmas)
// - connection: the `StorageHandle` implementation
// - params: conversion between crate values and rusqlite values
// - query: result extraction
// - transaction: `run_atomic` via BEGIN/COMMIT or nested savepoints

pub mod config;
pub mod connection;
pub mod params;
pub mod query;
mod transaction;

pub use config::{JournalMode, SqliteConfig};
pub use connection::SqliteHandle;
pub use query::build_result_set;
