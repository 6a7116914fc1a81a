use course_registry_core::db::open_db_in_memory;
use course_registry_core::{
    Document, FieldValue, MemoryDocumentStore, NewRegistration, Registration, RegistrationStore,
    SchemaProfile, SqliteDocumentStore, Timestamp,
};
use rusqlite::{params, Connection};

const COLLECTION: &str = "registrations";

fn seeded(course: &str, name: &str, created_at: Option<Timestamp>) -> Document {
    let mut doc = Document::new();
    doc.insert("courseName".to_string(), FieldValue::from(course));
    doc.insert("name".to_string(), FieldValue::from(name));
    doc.insert("phone".to_string(), FieldValue::from("010"));
    if let Some(created_at) = created_at {
        doc.insert("registrationDate".to_string(), FieldValue::Timestamp(created_at));
    }
    doc
}

fn at(seconds: i64, nanos: u32) -> Option<Timestamp> {
    Some(Timestamp::new(seconds, nanos))
}

/// Writes a document row directly, bypassing id assignment and the store clock.
fn insert_row(conn: &Connection, id: &str, doc: &Document) {
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
        params![COLLECTION, id, serde_json::to_string(doc).unwrap()],
    )
    .unwrap();
}

fn names(items: &[Registration]) -> Vec<&str> {
    items.iter().map(|item| item.name.as_str()).collect()
}

#[test]
fn list_by_course_sorts_newest_first_with_missing_timestamps_last() {
    let store = MemoryDocumentStore::new();
    store.insert_raw(COLLECTION, "r1", seeded("Yoga", "no-date", None));
    store.insert_raw(COLLECTION, "r2", seeded("Yoga", "old", at(100, 0)));
    store.insert_raw(COLLECTION, "r3", seeded("Yoga", "new", at(300, 0)));
    store.insert_raw(COLLECTION, "r4", seeded("Yoga", "mid", at(200, 0)));
    store.insert_raw(COLLECTION, "r5", seeded("Pilates", "other", at(999, 0)));

    let service = RegistrationStore::new(&store, SchemaProfile::Enrollment);
    let listed = service.list_by_course("Yoga").unwrap();

    assert_eq!(names(&listed), vec!["new", "mid", "old", "no-date"]);
}

#[test]
fn list_by_course_ignores_sub_second_precision() {
    let store = MemoryDocumentStore::new();
    store.insert_raw(COLLECTION, "a", seeded("Yoga", "early", at(50, 100)));
    store.insert_raw(COLLECTION, "b", seeded("Yoga", "late", at(50, 900)));

    let service = RegistrationStore::new(&store, SchemaProfile::Enrollment);
    let listed = service.list_by_course("Yoga").unwrap();

    // Same whole second: comparator reports equal, store order passes through.
    assert_eq!(names(&listed), vec!["early", "late"]);
}

#[test]
fn list_by_course_keeps_store_order_for_undated_records() {
    let store = MemoryDocumentStore::new();
    store.insert_raw(COLLECTION, "a", seeded("Yoga", "first", None));
    store.insert_raw(COLLECTION, "b", seeded("Yoga", "second", None));
    store.insert_raw(COLLECTION, "c", seeded("Yoga", "third", None));

    let service = RegistrationStore::new(&store, SchemaProfile::Enrollment);
    let listed = service.list_by_course("Yoga").unwrap();

    assert_eq!(names(&listed), vec!["first", "second", "third"]);
}

#[test]
fn list_all_uses_full_precision_and_places_undated_last() {
    let store = MemoryDocumentStore::new();
    store.insert_raw(COLLECTION, "a", seeded("Yoga", "undated", None));
    store.insert_raw(COLLECTION, "b", seeded("Yoga", "early", at(50, 100)));
    store.insert_raw(COLLECTION, "c", seeded("Art", "late", at(50, 900)));
    store.insert_raw(COLLECTION, "d", seeded("Art", "newest", at(60, 0)));

    let service = RegistrationStore::new(&store, SchemaProfile::Enrollment);
    let listed = service.list_all().unwrap();

    assert_eq!(names(&listed), vec!["newest", "late", "early", "undated"]);
    for pair in listed.windows(2) {
        assert!(pair[0].registration_seconds() >= pair[1].registration_seconds());
    }
}

#[test]
fn created_records_are_ordered_after_seeded_history() {
    let store = MemoryDocumentStore::new();
    store.insert_raw(COLLECTION, "old", seeded("Yoga", "old", at(1, 0)));

    let service = RegistrationStore::new(&store, SchemaProfile::Enrollment);
    let created = service
        .create(&NewRegistration::new("Yoga", "Kim", "010-1111-2222"))
        .unwrap();

    let listed = service.list_by_course("Yoga").unwrap();
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[1].name, "old");
}

#[test]
fn sqlite_list_all_orders_by_full_precision_with_undated_last() {
    let conn = open_db_in_memory().unwrap();
    insert_row(&conn, "a", &seeded("Yoga", "undated", None));
    insert_row(&conn, "b", &seeded("Yoga", "early", at(50, 100)));
    insert_row(&conn, "c", &seeded("Yoga", "late", at(50, 900)));
    insert_row(&conn, "d", &seeded("Yoga", "newest", at(60, 0)));

    let service = RegistrationStore::new(SqliteDocumentStore::new(&conn), SchemaProfile::Inquiry);

    let listed = service.list_all().unwrap();
    assert_eq!(names(&listed), vec!["newest", "late", "early", "undated"]);

    // Course listing compares whole seconds, so the 50s pair keeps row order.
    let by_course = service.list_by_course("Yoga").unwrap();
    assert_eq!(names(&by_course), vec!["newest", "early", "late", "undated"]);
}

#[test]
fn sqlite_list_all_places_explicit_null_dates_last() {
    let conn = open_db_in_memory().unwrap();
    let mut nulled = seeded("Yoga", "null-date", None);
    nulled.insert("registrationDate".to_string(), FieldValue::Null);
    insert_row(&conn, "a", &nulled);
    insert_row(&conn, "b", &seeded("Yoga", "dated", at(1, 0)));

    let service = RegistrationStore::new(SqliteDocumentStore::new(&conn), SchemaProfile::Inquiry);
    let listed = service.list_all().unwrap();

    assert_eq!(names(&listed), vec!["dated", "null-date"]);
}
