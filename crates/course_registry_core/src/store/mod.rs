//! Document-collection client boundary and its implementations.
//!
//! # Responsibility
//! - Define the `DocumentStore` contract consumed by registration services.
//! - Keep storage details (SQLite JSON columns, in-memory maps) behind it.
//!
//! # Invariants
//! - Document ids are assigned by the store on `add`, never by callers.
//! - Server timestamp sentinels are resolved with one clock reading per write,
//!   strictly increasing per store.
//! - Ordered queries place documents lacking the sort field last.
//! - `delete` of a missing id is a successful no-op.

use crate::db::DbError;
use crate::model::registration::RegistrationValidationError;
use crate::model::value::{Document, DocumentId, FieldValue, Timestamp, WriteDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod clock;
pub mod memory;
pub mod sqlite;

pub use clock::ServerClock;
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}$").expect("valid name regex"));

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surfaced by every store and registration operation.
#[derive(Debug)]
pub enum StoreError {
    /// Payload rejected before reaching the store.
    Validation(RegistrationValidationError),
    /// SQLite transport or bootstrap failure.
    Db(DbError),
    /// Target document does not exist.
    NotFound {
        collection: String,
        id: DocumentId,
    },
    /// Persisted data or names the store cannot interpret.
    InvalidData(String),
    /// Request shape the store does not support.
    Unsupported(String),
    /// Write succeeded but read-back disagrees.
    InconsistentState(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::Unsupported(message) => write!(f, "unsupported store request: {message}"),
            Self::InconsistentState(details) => write!(f, "inconsistent store state: {details}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl StoreError {
    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Db(_) => "db",
            Self::NotFound { .. } => "not_found",
            Self::InvalidData(_) => "invalid_data",
            Self::Unsupported(_) => "unsupported",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }
}

impl From<RegistrationValidationError> for StoreError {
    fn from(value: RegistrationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Document together with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub fields: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Document-collection client contract.
///
/// Collections are created implicitly on first write.
pub trait DocumentStore {
    /// Inserts a new document and returns the id the store assigned.
    fn add(&self, collection: &str, fields: &WriteDocument) -> StoreResult<DocumentId>;
    /// Fetches one document by id.
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    /// Returns documents whose `field` equals `value`, in insertion order.
    fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<Vec<StoredDocument>>;
    /// Returns all documents ordered by the timestamp in `field`.
    fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: SortDirection,
    ) -> StoreResult<Vec<StoredDocument>>;
    /// Merges `fields` over an existing document.
    fn update(&self, collection: &str, id: &str, fields: &WriteDocument) -> StoreResult<()>;
    /// Removes a document. Returns whether a document was removed.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn add(&self, collection: &str, fields: &WriteDocument) -> StoreResult<DocumentId> {
        (**self).add(collection, fields)
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        (**self).get(collection, id)
    }

    fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<Vec<StoredDocument>> {
        (**self).query_eq(collection, field, value)
    }

    fn query_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: SortDirection,
    ) -> StoreResult<Vec<StoredDocument>> {
        (**self).query_ordered(collection, field, direction)
    }

    fn update(&self, collection: &str, id: &str, fields: &WriteDocument) -> StoreResult<()> {
        (**self).update(collection, id, fields)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        (**self).delete(collection, id)
    }
}

/// Rejects collection and field names that are not plain identifiers.
pub fn validate_name(kind: &str, name: &str) -> StoreResult<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidData(format!("invalid {kind} name `{name}`")))
    }
}

/// Generates a new store-assigned document id.
pub fn new_document_id() -> DocumentId {
    Uuid::new_v4().simple().to_string()
}

/// Ordering for timestamp sort keys; missing keys go last in both directions.
pub(crate) fn compare_sort_keys(
    left: Option<Timestamp>,
    right: Option<Timestamp>,
    direction: SortDirection,
) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => match direction {
            SortDirection::Ascending => left.cmp(&right),
            SortDirection::Descending => right.cmp(&left),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{compare_sort_keys, new_document_id, validate_name, SortDirection};
    use crate::model::value::Timestamp;
    use std::cmp::Ordering;

    #[test]
    fn validate_name_accepts_identifiers_only() {
        assert!(validate_name("field", "registrationDate").is_ok());
        assert!(validate_name("field", "payment_status").is_ok());
        assert!(validate_name("field", "a.b").is_err());
        assert!(validate_name("collection", "").is_err());
        assert!(validate_name("field", "x\"; DROP").is_err());
    }

    #[test]
    fn missing_sort_keys_go_last_in_both_directions() {
        let ts = Some(Timestamp::new(1, 0));
        assert_eq!(
            compare_sort_keys(ts, None, SortDirection::Descending),
            Ordering::Less
        );
        assert_eq!(
            compare_sort_keys(ts, None, SortDirection::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare_sort_keys(None, None, SortDirection::Descending),
            Ordering::Equal
        );
    }

    #[test]
    fn generated_ids_are_unique_and_compact() {
        let first = new_document_id();
        let second = new_document_id();
        assert_ne!(first, second);
        assert_eq!(first.len(), 32);
    }
}
