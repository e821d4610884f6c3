//! SQLite storage bootstrap, schema migration and transactional access.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the board store.
//! - Apply schema migrations in deterministic order.
//! - Provide the [`Agent`] handle every write goes through.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Board code must not read/write rows before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod agent;
pub mod migrations;
mod open;

pub use agent::{read_in_snapshot, run_in_transaction, Agent};
pub use open::{open_db, open_db_in_memory, open_db_with_retry};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Startup connect loop gave up; carries the last failure.
    ConnectExhausted {
        attempts: u32,
        last: Box<DbError>,
    },
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
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ConnectExhausted { attempts, last } => {
                write!(f, "could not open database after {attempts} attempts: {last}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::ConnectExhausted { last, .. } => Some(last.as_ref()),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
