use course_registry_core::db::migrations::{current_user_version, latest_version};
use course_registry_core::db::{open_db, open_db_in_memory, DbError};
use course_registry_core::{
    DocumentStore, NewRegistration, RegistrationStore, SchemaProfile, SqliteDocumentStore,
    StoreError,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "documents");
    assert_table_exists(&conn, "store_clock");
}

#[test]
fn reopening_file_database_keeps_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.sqlite3");

    let id = {
        let conn = open_db(&path).unwrap();
        let store = SqliteDocumentStore::new(&conn);
        let service = RegistrationStore::new(store, SchemaProfile::Enrollment);
        service
            .create(&NewRegistration::new("Yoga", "Kim", "010-1111-2222"))
            .unwrap()
            .id
    };

    let conn = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    let store = SqliteDocumentStore::new(&conn);
    assert!(store.get("registrations", &id).unwrap().is_some());
}

#[test]
fn store_clock_stays_monotonic_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clock.sqlite3");

    let first = {
        let conn = open_db(&path).unwrap();
        let store = SqliteDocumentStore::new(&conn);
        let service = RegistrationStore::new(store, SchemaProfile::Inquiry);
        service
            .create(&NewRegistration::new("Yoga", "Kim", "010"))
            .unwrap()
    };

    // Push the persisted clock far into the future to simulate a clock step back.
    {
        let conn = open_db(&path).unwrap();
        conn.execute(
            "UPDATE store_clock SET seconds = 4102444800, nanos = 0 WHERE singleton = 1;",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    let service = RegistrationStore::new(SqliteDocumentStore::new(&conn), SchemaProfile::Inquiry);
    let second = service
        .create(&NewRegistration::new("Yoga", "Lee", "011"))
        .unwrap();

    assert!(second.registration_date.unwrap() > first.registration_date.unwrap());
    assert_eq!(second.registration_date.unwrap().seconds, 4102444800);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reopening_database_with_dropped_store_table_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("damaged.sqlite3");

    {
        let conn = open_db(&path).unwrap();
        conn.execute_batch("DROP TABLE store_clock;").unwrap();
    }

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::MissingStoreTable {
            table: "store_clock",
            version: 2
        }
    ));
    assert_eq!(err.code(), "missing_store_table");
}

#[test]
fn corrupt_store_clock_row_fails_writes_with_db_error() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO store_clock (singleton, seconds, nanos) VALUES (1, 10, -3);",
        [],
    )
    .unwrap();

    let service = RegistrationStore::new(SqliteDocumentStore::new(&conn), SchemaProfile::Inquiry);
    let err = service
        .create(&NewRegistration::new("Yoga", "Kim", "010"))
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Db(DbError::CorruptStoreClock {
            seconds: 10,
            nanos: -3
        })
    ));
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
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
