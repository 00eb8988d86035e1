#![cfg(feature = "sqlite")]
use sql_fragment::prelude::*;
use sql_fragment::Slot;

fn setup() -> Result<SqliteHandle, SqlFragmentError> {
    let mut db = SqliteHandle::open_in_memory()?;
    db.execute_batch(
        "CREATE TABLE test (
            recid INTEGER PRIMARY KEY AUTOINCREMENT,
            a INTEGER,
            b TEXT,
            c BLOB,
            d REAL,
            e TEXT
        );",
    )?;
    Ok(db)
}

#[test]
fn exactly_one_over_zero_one_and_two_rows() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;

    let err = db.one(sql!("SELECT a FROM test")).unwrap_err();
    assert!(matches!(
        err,
        SqlFragmentError::Cardinality {
            shape: CallShape::One,
            actual: 0,
            ..
        }
    ));

    db.none(sql!("INSERT INTO test (a) VALUES (" {1} ")"))?;
    let row = db.one(sql!("SELECT a FROM test"))?;
    assert_eq!(row.get("a"), Some(&RowValues::Int(1)));

    db.none(sql!("INSERT INTO test (a) VALUES (" {2} ")"))?;
    let err = db.one(sql!("SELECT a FROM test")).unwrap_err();
    assert!(err.to_string().contains("got 2"));
    Ok(())
}

#[test]
fn maybe_one_many_and_none() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    assert!(db.maybe_one(sql!("SELECT a FROM test"))?.is_none());
    assert!(db.many(sql!("SELECT a FROM test"))?.is_empty());

    for a in [5, 6, 7] {
        db.none(sql!("INSERT INTO test (a) VALUES (" {a} ")"))?;
    }
    let all = db.many(
        sql!("SELECT a FROM test ORDER BY a")
            .map_rows(|row| Ok(row.get("a").and_then(RowValues::as_int))),
    )?;
    assert_eq!(all, vec![Some(5), Some(6), Some(7)]);

    let err = db.maybe_one(sql!("SELECT a FROM test")).unwrap_err();
    assert!(err.is_cardinality());

    let err = db
        .none(sql!("DELETE FROM test WHERE a = " {5} " RETURNING recid"))
        .unwrap_err();
    assert!(matches!(err, SqlFragmentError::Cardinality { actual: 1, .. }));
    Ok(())
}

#[test]
fn coerced_values_round_trip_through_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    let payload: Vec<u8> = (0u8..32).collect();
    let view = ByteView::new(payload, 8, 4)?;
    let nickname: Option<String> = None;

    db.none(sql!(
        "INSERT INTO test (a, b, c, d, e) VALUES ("
        {Fragment::join([
            Slot::from(10),
            Slot::from(true),
            Slot::from(view),
            Slot::from(2.5),
            Slot::from(nickname),
        ])}
        ")"
    ))?;

    let row = db.one(sql!("SELECT a, b, c, d, e FROM test"))?;
    assert_eq!(row.get("a"), Some(&RowValues::Int(10)));
    assert_eq!(row.get("b"), Some(&RowValues::Text("true".into())));
    assert_eq!(row.get("c"), Some(&RowValues::Blob(vec![8, 9, 10, 11])));
    assert_eq!(row.get("d"), Some(&RowValues::Float(2.5)));
    assert_eq!(row.get("e"), Some(&RowValues::Null));
    assert_eq!(row.get("b").and_then(RowValues::as_bool), Some(true));
    Ok(())
}

#[test]
fn hostile_text_is_bound_not_spliced() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    let hostile = "x'); DROP TABLE test; --";
    db.none(sql!("INSERT INTO test (b) VALUES (" {hostile} ")"))?;
    let row = db.one(sql!("SELECT b FROM test WHERE b = " {hostile}))?;
    assert_eq!(row.get("b").and_then(RowValues::as_text), Some(hostile));
    Ok(())
}

#[test]
fn empty_in_list_matches_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    db.none(sql!("INSERT INTO test (a) VALUES (" {1} ")"))?;
    let ids: Vec<i64> = Vec::new();
    let rows = db.many(sql!("SELECT a FROM test WHERE a IN (" {Fragment::join(ids)} ")"))?;
    assert!(rows.is_empty());
    let rows = db.many(sql!("SELECT a FROM test WHERE a NOT IN (" {Fragment::join([2, 3])} ")"))?;
    assert_eq!(rows.len(), 1);
    Ok(())
}

#[test]
fn fetch_reports_rows_written() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    for a in [1, 2, 3] {
        db.none(sql!("INSERT INTO test (a) VALUES (" {a} ")"))?;
    }
    let updated = db.fetch(sql!("UPDATE test SET b = " {"x"} " WHERE a >= " {2}))?;
    assert_eq!(updated.rows_written, 2);
    assert_eq!(updated.rows_read, 0);

    let read = db.fetch(sql!("SELECT a FROM test"))?;
    assert_eq!(read.rows_read, 3);
    assert_eq!(read.rows_written, 0);
    assert_eq!(read.column_names(), &["a".to_owned()]);
    Ok(())
}

#[test]
fn ddl_after_dml_reports_no_rows_written() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    for a in [1, 2, 3] {
        db.none(sql!("INSERT INTO test (a) VALUES (" {a} ")"))?;
    }
    let updated = db.fetch(sql!("UPDATE test SET a = a + 1"))?;
    assert_eq!(updated.rows_written, 3);

    let created = db.fetch(sql!("CREATE TABLE other (b INTEGER)"))?;
    assert_eq!(created.rows_written, 0);

    let deleted = db.fetch(sql!("DELETE FROM test WHERE a > " {2}))?;
    assert_eq!(deleted.rows_written, 2);
    let dropped = db.fetch(sql!("DROP TABLE other"))?;
    assert_eq!(dropped.rows_written, 0);
    Ok(())
}

#[test]
fn malformed_sql_is_a_host_rejection() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    let err = db.none(sql!("SELEKT nonsense")).unwrap_err();
    assert!(err.is_host_rejection());
    assert!(matches!(err, SqlFragmentError::SqliteError(_)));
    Ok(())
}

#[test]
fn atomic_commits_and_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;

    db.atomic(|db| {
        db.none(sql!("INSERT INTO test (a) VALUES (" {1} ")"))?;
        db.none(sql!("INSERT INTO test (a) VALUES (" {2} ")"))
    })?;
    assert!(!db.in_transaction());

    let err = db
        .atomic(|db| {
            db.none(sql!("INSERT INTO test (a) VALUES (" {3} ")"))?;
            db.none(sql!("INSERT INTO missing_table (a) VALUES (" {4} ")"))
        })
        .unwrap_err();
    assert!(err.is_host_rejection());
    assert!(!db.in_transaction());

    let count = db.one(sql!("SELECT COUNT(*) AS n FROM test"))?;
    assert_eq!(count.get("n"), Some(&RowValues::Int(2)));
    Ok(())
}

#[test]
fn nested_atomic_rolls_back_inner_scope_only() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;

    db.atomic(|db| {
        db.none(sql!("INSERT INTO test (a) VALUES (" {1} ")"))?;
        let inner = db.atomic(|db| {
            db.none(sql!("INSERT INTO test (a) VALUES (" {2} ")"))?;
            Err::<(), _>(SqlFragmentError::ExecutionError("inner failure".into()))
        });
        assert!(inner.is_err());
        assert!(db.in_transaction());
        db.none(sql!("INSERT INTO test (a) VALUES (" {3} ")"))
    })?;

    let values = db.many(
        sql!("SELECT a FROM test ORDER BY a")
            .map_rows(|row| Ok(row.get_by_index(0).and_then(RowValues::as_int))),
    )?;
    assert_eq!(values, vec![Some(1), Some(3)]);
    Ok(())
}

#[test]
fn numbered_placeholders_execute() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = setup()?;
    let stmt = flatten_with(
        sql!("INSERT INTO test (a, b) VALUES (" {9} ", " {"nine"} ")"),
        PlaceholderStyle::Numbered,
    );
    assert_eq!(stmt.text(), "INSERT INTO test (a, b) VALUES (?1, ?2)");
    let rs = db.execute_statement(&stmt)?;
    assert_eq!(rs.rows_written, 1);
    Ok(())
}
