//! Document store schema steps and their executor.
//!
//! # Responsibility
//! - List the schema steps that create the store tables.
//! - Bring a connection up to the latest step and verify the result.
//!
//! # Invariants
//! - Step versions are strictly increasing.
//! - Every table a step introduces must exist once `user_version` covers it.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, OptionalExtension};

/// One schema step and the table it introduces.
struct SchemaStep {
    version: u32,
    table: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        table: "documents",
        sql: include_str!("0001_documents.sql"),
    },
    SchemaStep {
        version: 2,
        table: "store_clock",
        sql: include_str!("0002_store_clock.sql"),
    },
];

/// Version range covered by one `apply_migrations` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaUpgrade {
    pub from_version: u32,
    pub to_version: u32,
}

impl SchemaUpgrade {
    pub fn applied_any(&self) -> bool {
        self.from_version < self.to_version
    }
}

/// Latest schema version this build can create.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Runs pending schema steps in one transaction, then checks the store tables.
///
/// Databases already at the latest version are only verified.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<SchemaUpgrade> {
    let from_version = current_user_version(conn)?;
    let to_version = latest_version();
    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }

    let upgrade = SchemaUpgrade {
        from_version,
        to_version,
    };
    if !upgrade.applied_any() {
        verify_store_tables(conn, to_version)?;
        return Ok(upgrade);
    }

    let tx = conn.transaction()?;
    let mut applied = 0;
    for step in SCHEMA_STEPS.iter().filter(|step| step.version > from_version) {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        applied += 1;
    }
    verify_store_tables(&tx, to_version)?;
    tx.commit()?;

    info!(
        "event=store_schema_upgrade module=db status=ok from_version={} to_version={} steps={}",
        from_version, to_version, applied
    );
    Ok(upgrade)
}

/// Reads the schema version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

fn verify_store_tables(conn: &Connection, version: u32) -> DbResult<()> {
    for step in SCHEMA_STEPS.iter().filter(|step| step.version <= version) {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                [step.table],
                |row| row.get(0),
            )
            .optional()?;
        if found.is_none() {
            return Err(DbError::MissingStoreTable {
                table: step.table,
                version: step.version,
            });
        }
    }
    Ok(())
}
