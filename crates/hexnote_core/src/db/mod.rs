//! SQLite storage bootstrap for the journal store.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the `entries` and `tags`
//!   collections.
//! - Install the bootstrap schema before any repository touches the file.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - There is no migration chain: unknown versions are rejected, never
//!   rewritten.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion { db_version: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                supported,
            } => write!(
                f,
                "database schema version {db_version} is not supported (expected {supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
