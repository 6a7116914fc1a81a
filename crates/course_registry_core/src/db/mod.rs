//! SQLite schema and bootstrap for the document store.
//!
//! # Responsibility
//! - Open connections backing `SqliteDocumentStore` with the store schema in place.
//! - Own the persisted `store_clock` row and its validation.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A connection is handed out only after every store table is verified.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
pub mod store_clock;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures of the SQLite layer beneath the document store.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Database was written by a newer build of the store.
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },
    /// `user_version` claims a schema whose table is absent.
    MissingStoreTable { table: &'static str, version: u32 },
    /// Persisted clock row cannot be turned into a timestamp.
    CorruptStoreClock { seconds: i64, nanos: i64 },
}

impl DbError {
    /// Short code for `error_code=` log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::UnsupportedSchemaVersion { .. } => "schema_too_new",
            Self::MissingStoreTable { .. } => "missing_store_table",
            Self::CorruptStoreClock { .. } => "corrupt_store_clock",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "document store schema v{db_version} is newer than this build (v{latest_supported})"
            ),
            Self::MissingStoreTable { table, version } => {
                write!(f, "store table `{table}` from schema v{version} is missing")
            }
            Self::CorruptStoreClock { seconds, nanos } => {
                write!(f, "store clock row ({seconds}, {nanos}) is not a valid timestamp")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
