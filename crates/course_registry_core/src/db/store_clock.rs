//! Persisted high-water mark of the SQLite store's server clock.

use crate::db::{DbError, DbResult};
use crate::model::value::Timestamp;
use rusqlite::{params, Connection, OptionalExtension};

const MAX_NANOS: i64 = 999_999_999;

/// Last timestamp issued by this database, `None` before the first write.
pub fn load_store_clock(conn: &Connection) -> DbResult<Option<Timestamp>> {
    let row = conn
        .query_row(
            "SELECT seconds, nanos FROM store_clock WHERE singleton = 1;",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;

    row.map(|(seconds, nanos)| match u32::try_from(nanos) {
        Ok(valid) if nanos <= MAX_NANOS && seconds >= 0 => Ok(Timestamp::new(seconds, valid)),
        _ => Err(DbError::CorruptStoreClock { seconds, nanos }),
    })
    .transpose()
}

/// Records `issued` as the new high-water mark.
pub fn save_store_clock(conn: &Connection, issued: Timestamp) -> DbResult<()> {
    conn.execute(
        "INSERT INTO store_clock (singleton, seconds, nanos) VALUES (1, ?1, ?2)
         ON CONFLICT(singleton) DO UPDATE SET
            seconds = excluded.seconds,
            nanos = excluded.nanos;",
        params![issued.seconds, i64::from(issued.nanos)],
    )?;
    Ok(())
}
