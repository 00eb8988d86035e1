#![cfg(feature = "sqlite")]
use std::cell::Cell;
use std::rc::Rc;

use rusqlite::{Connection, OpenFlags};
use sql_fragment::meta::MetadataTable;
use sql_fragment::prelude::*;
use tempfile::TempDir;

fn open_read_only(path: &std::path::Path) -> Result<SqliteHandle, rusqlite::Error> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(SqliteHandle::from_connection(conn))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn steps() -> Vec<Migration<SqliteHandle>> {
    vec![
        Migration::statements(
            "create_users",
            &["CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"],
        ),
        Migration::statements(
            "add_email",
            &[
                "ALTER TABLE users ADD COLUMN email TEXT",
                "CREATE INDEX IF NOT EXISTS users_email ON users (email)",
            ],
        ),
        Migration::new("seed_admin", |db: &mut SqliteHandle| {
            db.none(sql!(
                "INSERT INTO users (name, email) VALUES (" {"admin"} ", " {"admin@example.com"} ")"
            ))
        }),
    ]
}

#[test]
fn fresh_database_reaches_latest_version() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut db = SqliteHandle::open_in_memory()?;
    let runner = MigrationRunner::new(steps())?;

    let status = runner.status(&mut db)?;
    assert_eq!(status.current_version, 0);
    assert_eq!(status.target_version, 3);
    assert_eq!(status.pending_steps, vec!["create_users", "add_email", "seed_admin"]);

    let report = runner.run(&mut db)?;
    assert_eq!(report.from_version, 0);
    assert_eq!(report.to_version, 3);
    assert_eq!(report.applied.len(), 3);
    assert_eq!(MetadataTable::default().schema_version(&mut db)?, 3);

    let admin = db.one(sql!("SELECT email FROM users WHERE name = " {"admin"}))?;
    assert_eq!(
        admin.get("email").and_then(RowValues::as_text),
        Some("admin@example.com")
    );

    // second run touches nothing
    let again = runner.run(&mut db)?;
    assert!(again.is_noop());
    assert_eq!(again.to_version, 3);
    assert_eq!(db.many(sql!("SELECT id FROM users"))?.len(), 1);
    assert!(runner.status(&mut db)?.is_current());
    Ok(())
}

#[test]
fn failed_step_resumes_after_reopen() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("app.db");

    {
        let mut db = SqliteConfig::new(path.to_string_lossy()).open()?;
        let mut broken = steps();
        broken[1] = Migration::statements(
            "add_email",
            &["ALTER TABLE no_such_table ADD COLUMN email TEXT"],
        );
        let err = MigrationRunner::new(broken)?.run(&mut db).unwrap_err();
        assert_eq!(err.migration_step(), Some(("add_email", 2)));
        assert!(err.into_cause().is_host_rejection());
        assert_eq!(MetadataTable::default().schema_version(&mut db)?, 1);
    }

    let mut db = SqliteConfig::new(path.to_string_lossy()).open()?;
    let runner = MigrationRunner::new(steps())?;
    let status = runner.status(&mut db)?;
    assert_eq!(status.current_version, 1);
    assert_eq!(status.pending_steps, vec!["add_email", "seed_admin"]);

    let report = runner.run(&mut db)?;
    assert_eq!(report.from_version, 1);
    assert_eq!(report.applied, vec!["add_email", "seed_admin"]);
    assert_eq!(MetadataTable::default().schema_version(&mut db)?, 3);
    Ok(())
}

#[test]
fn database_ahead_of_known_steps_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = SqliteHandle::open_in_memory()?;
    MetadataTable::default().set_schema_version(&mut db, 7)?;

    let runner = MigrationRunner::new(steps())?;
    let err = runner.run(&mut db).unwrap_err();
    assert!(matches!(
        err,
        SqlFragmentError::SchemaAhead { found: 7, known: 3 }
    ));
    assert_eq!(MetadataTable::default().schema_version(&mut db)?, 7);
    Ok(())
}

#[test]
fn custom_metadata_table_and_hooks() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = SqliteHandle::open_in_memory()?;
    let hook_calls = Rc::new(Cell::new(0));
    let pending_seen = Rc::new(Cell::new(0));

    let calls = Rc::clone(&hook_calls);
    let seen = Rc::clone(&pending_seen);
    let runner = MigrationRunner::new(vec![
        Migration::statements("create_notes", &["CREATE TABLE notes (body TEXT)"]).before_apply(
            move |_db: &mut SqliteHandle| {
                calls.set(calls.get() + 1);
                Ok(())
            },
        ),
    ])?
    .with_metadata_table("app_settings")?
    .on_pending(move |pending| seen.set(pending.len()));

    runner.run(&mut db)?;
    runner.run(&mut db)?;
    assert_eq!(hook_calls.get(), 1);
    assert_eq!(pending_seen.get(), 1);

    let stored = db.one(
        sql!("SELECT value FROM app_settings WHERE key = " {"schema_version"})
            .map_rows(|row| Ok(row.get_by_index(0).and_then(RowValues::as_int))),
    )?;
    assert_eq!(stored, Some(1));

    let missing = db.one(sql!(
        "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = '_meta'"
    ))?;
    assert_eq!(missing.get("n"), Some(&RowValues::Int(0)));
    Ok(())
}

#[test]
fn step_may_opt_into_a_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = SqliteHandle::open_in_memory()?;
    let runner = MigrationRunner::new(vec![
        Migration::statements("create_t", &["CREATE TABLE t (a INTEGER NOT NULL)"]),
        Migration::new("fill_t", |db: &mut SqliteHandle| {
            db.atomic(|db| {
                db.none(sql!("INSERT INTO t (a) VALUES (" {1} ")"))?;
                db.none(sql!("INSERT INTO t (a) VALUES (" {Scalar::Null} ")"))
            })
        }),
    ])?;

    let err = runner.run(&mut db).unwrap_err();
    assert_eq!(err.migration_step(), Some(("fill_t", 2)));
    assert_eq!(db.many(sql!("SELECT a FROM t"))?.len(), 0);
    assert_eq!(MetadataTable::default().schema_version(&mut db)?, 1);
    Ok(())
}


#[test]
fn status_works_on_a_read_only_connection() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let dir = TempDir::new()?;
    let path = dir.path().join("replica.db");
    SqliteHandle::open(&path)?.execute_batch("CREATE TABLE unrelated (x INTEGER);")?;

    let runner = MigrationRunner::new(steps())?;
    {
        let mut ro = open_read_only(&path)?;
        let status = runner.status(&mut ro)?;
        assert_eq!(status.current_version, 0);
        assert_eq!(status.pending_steps.len(), 3);
        assert!(!ro.has_table("_meta")?);
    }

    runner.run(&mut SqliteHandle::open(&path)?)?;

    let mut ro = open_read_only(&path)?;
    let status = runner.status(&mut ro)?;
    assert_eq!(status.current_version, 3);
    assert!(status.is_current());
    assert!(runner.run(&mut ro)?.is_noop());

    let err = ro.none(sql!("INSERT INTO users (name) VALUES (" {"x"} ")")).unwrap_err();
    assert!(err.is_host_rejection());
    Ok(())
}
