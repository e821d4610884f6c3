//! Board schema migrations.
//!
//! # Responsibility
//! - Hold the ordered list of embedded board schema steps.
//! - Bring a store from its recorded version up to [`latest_version`].
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - All pending steps apply in one transaction; the recorded version is
//!   `PRAGMA user_version` and only moves forward.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "board",
        sql: include_str!("0001_board.sql"),
    },
    SchemaStep {
        version: 2,
        name: "card_updates",
        sql: include_str!("0002_card_updates.sql"),
    },
];

/// Schema version this binary writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Applies every step newer than the store's recorded version.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the store was written by a newer binary.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let recorded = recorded_version(conn)?;
    let latest = latest_version();
    if recorded > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: recorded,
            latest_supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > recorded)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;

    let names: Vec<&str> = pending.iter().map(|step| step.name).collect();
    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        recorded,
        latest,
        names.join(",")
    );
    Ok(())
}

fn recorded_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?;
    Ok(version)
}
