//! Core logic for persisting course registration form submissions.
//! Registrations live in a document collection behind `DocumentStore`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, RegistryConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::registration::{
    NewRegistration, Registration, RegistrationId, RegistrationPatch,
    RegistrationValidationError, SchemaProfile, DEFAULT_COLLECTION,
};
pub use model::value::{Document, DocumentId, FieldValue, Timestamp, WriteDocument, WriteValue};
pub use service::registration_service::{sort_newest_first, RegistrationStore};
pub use store::{
    DocumentStore, MemoryDocumentStore, SortDirection, SqliteDocumentStore, StoreError,
    StoreResult, StoredDocument,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
