//! In-process document store.
//!
//! # Responsibility
//! - Provide a `DocumentStore` with no external dependencies, used as a
//!   substitute store in tests and for ephemeral runs.
//!
//! # Invariants
//! - Each collection keeps documents in insertion order, and server
//!   timestamps are non-decreasing along that order.
//! - All state sits behind one mutex, so the store is `Sync`.

use crate::model::value::{resolve_write, Document, DocumentId, FieldValue, WriteDocument};
use crate::store::{
    compare_sort_keys, new_document_id, validate_name, DocumentStore, ServerClock, SortDirection,
    StoreError, StoreResult, StoredDocument,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Mutex-guarded in-memory document collections.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<BTreeMap<String, Vec<StoredDocument>>>,
    clock: ServerClock,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully resolved document under a caller-chosen id.
    ///
    /// Bypasses id assignment and the server clock; meant for seeding
    /// fixtures such as documents without a creation timestamp.
    pub fn insert_raw(&self, collection: &str, id: impl Into<DocumentId>, fields: Document) {
        let id = id.into();
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.retain(|doc| doc.id != id);
        docs.push(StoredDocument { id, fields });
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<StoredDocument>>> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn add(&self, collection: &str, fields: &WriteDocument) -> StoreResult<DocumentId> {
        validate_name("collection", collection)?;
        for field in fields.keys() {
            validate_name("field", field)?;
        }

        let id = new_document_id();
        // Clock reading and push share the lock so timestamps follow insertion order.
        let mut collections = self.lock();
        let resolved = resolve_write(fields, self.clock.issue());
        collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields: resolved,
            });
        Ok(id)
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        validate_name("collection", collection)?;
        Ok(self.lock().get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| doc.id == id)
                .map(|doc| doc.fields.clone())
        }))
    }

    fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<Vec<StoredDocument>> {
        validate_name("collection", collection)?;
        validate_name("field", field)?;
        let collections = self.lock();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|doc| doc.fields.get(field).unwrap_or(&FieldValue::Null) == value)
            .cloned()
            .collect())
    }

    fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: SortDirection,
    ) -> StoreResult<Vec<StoredDocument>> {
        validate_name("collection", collection)?;
        validate_name("field", field)?;
        let mut docs = self.lock().get(collection).cloned().unwrap_or_default();
        docs.sort_by(|left, right| {
            compare_sort_keys(
                left.fields.get(field).and_then(FieldValue::as_timestamp),
                right.fields.get(field).and_then(FieldValue::as_timestamp),
                direction,
            )
        });
        Ok(docs)
    }

    fn update(&self, collection: &str, id: &str, fields: &WriteDocument) -> StoreResult<()> {
        validate_name("collection", collection)?;
        for field in fields.keys() {
            validate_name("field", field)?;
        }

        let mut collections = self.lock();
        let target = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        let resolved = resolve_write(fields, self.clock.issue());
        target.fields.extend(resolved);
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        validate_name("collection", collection)?;
        let mut collections = self.lock();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        Ok(docs.len() != before)
    }
}
