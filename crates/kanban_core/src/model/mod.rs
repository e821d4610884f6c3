//! Board domain model.
//!
//! # Responsibility
//! - Define persisted entities (project, column, card, tag, link).
//! - Define the hydrated tree returned to callers and the write payloads.
//!
//! # Invariants
//! - Entity ids are opaque strings; fresh ids are UUID v4 text.
//! - `order` is a dense, zero-based position among siblings of one parent.

pub mod board;
pub mod input;
