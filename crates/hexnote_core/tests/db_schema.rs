use hexnote_core::db::schema::SCHEMA_VERSION;
use hexnote_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_installs_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), SCHEMA_VERSION);
    for table in ["entries", "entry_revisions", "entry_tags", "tags"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hexnote.db");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), SCHEMA_VERSION);
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), SCHEMA_VERSION);
    assert_table_exists(&second, "entries");
}

#[test]
fn unknown_schema_version_is_rejected_not_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 7;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            supported,
        } => {
            assert_eq!(db_version, 7);
            assert_eq!(supported, SCHEMA_VERSION);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enabled() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
