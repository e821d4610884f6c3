//! Core persistence and consistency engine for kanban boards.
//! This crate is the single source of truth for sibling-order and tag-link
//! invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, IgnoredOverride, KanbanConfig};
pub use db::{
    open_db, open_db_in_memory, open_db_with_retry, read_in_snapshot, Agent, DbError, DbResult,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSink, LoggingError};
pub use model::board::{
    AuditMeta, Card, CardTree, CardUpdateRecord, Column, ColumnTree, EntityId,
    Placement, Project, ProjectTree, Tag,
};
pub use model::input::{CardInput, CardUpdate, ColumnInput, ProjectInput, TagInput};
pub use repo::ordering::SiblingScope;
pub use repo::{BoardError, BoardResult, EntityKind, ErrorKind};
pub use service::board_service::BoardService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
