//! Row-level persistence for the board hierarchy.
//!
//! # Responsibility
//! - Keep SQL for sibling ordering, tag links, reads and row writes inside
//!   the core persistence boundary.
//! - Return semantic errors (`NotFound`, `NoEffect`) in addition to store
//!   transport errors.
//!
//! # Invariants
//! - Every function takes an [`Agent`](crate::db::Agent); callers decide
//!   whether it is transaction-bound.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod ordering;
pub mod reader;
pub mod tag_link;
pub mod writer;

pub type BoardResult<T> = Result<T, BoardError>;

/// Board entity kinds, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Column,
    Card,
    Tag,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Project => "project",
            Self::Column => "column",
            Self::Card => "card",
            Self::Tag => "tag",
        };
        f.write_str(label)
    }
}

/// Coarse error category for boundary translation (404 / 409 / 400 / 500).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NoEffect,
    Invalid,
    Store,
}

/// Errors from board persistence and orchestration.
#[derive(Debug)]
pub enum BoardError {
    /// Lookup by id matched no row.
    NotFound { entity: EntityKind, id: String },
    /// A write affected zero rows, or targeted a row owned elsewhere.
    NoEffect { operation: &'static str },
    /// Entity name is blank after trim.
    InvalidName(EntityKind),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Any other store failure.
    Store(DbError),
}

impl BoardError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NoEffect { .. } => ErrorKind::NoEffect,
            Self::InvalidName(_) => ErrorKind::Invalid,
            Self::InvalidData(_) | Self::Store(_) => ErrorKind::Store,
        }
    }
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::NoEffect { operation } => write!(f, "no rows were affected by {operation}"),
            Self::InvalidName(entity) => write!(f, "{entity} name must not be blank"),
            Self::InvalidData(message) => write!(f, "invalid persisted board data: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for BoardError {
    fn from(value: DbError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for BoardError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}
