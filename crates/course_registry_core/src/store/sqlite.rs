//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist documents as JSON bodies in the `documents` table.
//! - Use JSON1 `json_extract` for equality filters and timestamp ordering.
//!
//! # Invariants
//! - Every write runs in one transaction together with its clock advance.
//! - The server clock is persisted in `store_clock`, so timestamps stay
//!   strictly increasing across reopen of the same database file.
//! - Read paths reject bodies that are not flat documents.

use crate::model::value::{
    resolve_write, Document, DocumentId, FieldValue, Timestamp, WriteDocument,
};
use crate::db::store_clock::{load_store_clock, save_store_clock};
use crate::store::clock::next_after;
use crate::store::{
    new_document_id, validate_name, DocumentStore, SortDirection, StoreError, StoreResult,
    StoredDocument,
};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};

/// Document store over a migrated SQLite connection.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn add(&self, collection: &str, fields: &WriteDocument) -> StoreResult<DocumentId> {
        validate_write(collection, fields)?;

        let tx = self.conn.unchecked_transaction()?;
        let commit_time = advance_clock(&tx)?;
        let id = new_document_id();
        let body = serde_json::to_string(&resolve_write(fields, commit_time))?;
        tx.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![collection, id.as_str(), body],
        )?;
        tx.commit()?;

        Ok(id)
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        validate_name("collection", collection)?;
        load_body(self.conn, collection, id)
    }

    fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<Vec<StoredDocument>> {
        validate_name("collection", collection)?;
        validate_name("field", field)?;
        let (bound, json_type) = filter_value(value)?;

        let mut stmt = self.conn.prepare(
            "SELECT id, body
             FROM documents
             WHERE collection = ?1
               AND json_extract(body, ?2) IS ?3
               AND (?4 IS NULL OR json_type(body, ?2) = ?4)
             ORDER BY seq ASC;",
        )?;
        let mut rows = stmt.query(params![collection, field_path(field), bound, json_type])?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next()? {
            docs.push(parse_stored(row.get("id")?, &row.get::<_, String>("body")?)?);
        }

        Ok(docs)
    }

    fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: SortDirection,
    ) -> StoreResult<Vec<StoredDocument>> {
        validate_name("collection", collection)?;
        validate_name("field", field)?;
        let keyword = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };

        let sql = format!(
            "SELECT id, body
             FROM documents
             WHERE collection = ?1
             ORDER BY
                json_extract(body, ?2) IS NULL,
                json_extract(body, ?2) {keyword},
                json_extract(body, ?3) {keyword},
                seq ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            collection,
            format!("{}.seconds", field_path(field)),
            format!("{}.nanos", field_path(field)),
        ])?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next()? {
            docs.push(parse_stored(row.get("id")?, &row.get::<_, String>("body")?)?);
        }

        Ok(docs)
    }

    fn update(&self, collection: &str, id: &str, fields: &WriteDocument) -> StoreResult<()> {
        validate_write(collection, fields)?;

        let tx = self.conn.unchecked_transaction()?;
        let mut current = load_body(&tx, collection, id)?.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        let commit_time = advance_clock(&tx)?;
        current.extend(resolve_write(fields, commit_time));

        tx.execute(
            "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2;",
            params![collection, id, serde_json::to_string(&current)?],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        validate_name("collection", collection)?;
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
        )?;
        Ok(changed > 0)
    }
}

fn validate_write(collection: &str, fields: &WriteDocument) -> StoreResult<()> {
    validate_name("collection", collection)?;
    for field in fields.keys() {
        validate_name("field", field)?;
    }
    Ok(())
}

fn field_path(field: &str) -> String {
    format!("$.\"{field}\"")
}

/// SQL value for `json_extract` equality plus the `json_type` it must carry.
///
/// JSON1 extracts booleans as 0/1 and objects as text, so the type check keeps
/// `true` from matching `1` and timestamps from matching strings.
fn filter_value(value: &FieldValue) -> StoreResult<(Value, Option<&'static str>)> {
    match value {
        FieldValue::Null => Ok((Value::Null, None)),
        FieldValue::Bool(true) => Ok((Value::Integer(1), Some("true"))),
        FieldValue::Bool(false) => Ok((Value::Integer(0), Some("false"))),
        FieldValue::Integer(number) => Ok((Value::Integer(*number), Some("integer"))),
        FieldValue::String(text) => Ok((Value::Text(text.clone()), Some("text"))),
        FieldValue::Timestamp(_) => Err(StoreError::Unsupported(
            "equality filter on timestamp fields".to_string(),
        )),
    }
}

fn load_body(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    body.map(|text| parse_body(id, &text)).transpose()
}

fn parse_stored(id: String, body: &str) -> StoreResult<StoredDocument> {
    let fields = parse_body(&id, body)?;
    Ok(StoredDocument { id, fields })
}

fn parse_body(id: &str, body: &str) -> StoreResult<Document> {
    serde_json::from_str(body).map_err(|err| {
        StoreError::InvalidData(format!("document `{id}` has a malformed body: {err}"))
    })
}

fn advance_clock(conn: &Connection) -> StoreResult<Timestamp> {
    let issued = next_after(load_store_clock(conn)?, Timestamp::now());
    save_store_clock(conn, issued)?;
    Ok(issued)
}
