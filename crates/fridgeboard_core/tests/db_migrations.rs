use fridgeboard_core::db::migrations::latest_version;
use fridgeboard_core::db::{ensure_schema, open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "local_storage");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fridgeboard.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO local_storage (key, value) VALUES ('smartFridge_waterCount', '3');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let value: String = conn_second
        .query_row(
            "SELECT value FROM local_storage WHERE key = 'smartFridge_waterCount';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, "3");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn updated_at_defaults_to_epoch_millis() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO local_storage (key, value) VALUES ('k', 'v');",
        [],
    )
    .unwrap();

    let updated_at: i64 = conn
        .query_row(
            "SELECT updated_at FROM local_storage WHERE key = 'k';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(updated_at > 1_600_000_000_000);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table}` to exist");
}

#[test]
fn ensure_schema_accepts_only_bootstrapped_connections() {
    let migrated = open_db_in_memory().unwrap();
    ensure_schema(&migrated).unwrap();

    let raw = Connection::open_in_memory().unwrap();
    assert!(matches!(
        ensure_schema(&raw),
        Err(DbError::SchemaOutdated { found: 0, .. })
    ));
}
