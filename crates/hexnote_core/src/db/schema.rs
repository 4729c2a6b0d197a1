//! Bootstrap schema for the journal database.
//!
//! The store holds two collections: `entries` (with its `entry_revisions`
//! and `entry_tags` child tables) and the flat `tags` registry.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// Version written to `PRAGMA user_version` once the schema is installed.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Installs the schema on a fresh database, accepts an already installed
/// one and rejects any other version.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    match current_user_version(conn)? {
        0 => {
            let tx = conn.transaction()?;
            tx.execute_batch(SCHEMA_SQL)?;
            tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
            tx.commit()?;
            Ok(())
        }
        SCHEMA_VERSION => Ok(()),
        other => Err(DbError::UnsupportedSchemaVersion {
            db_version: other,
            supported: SCHEMA_VERSION,
        }),
    }
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
