//! Idempotent card↔tag link maintenance.
//!
//! # Invariants
//! - `(card_id, tag_id)` occurs at most once; the primary key on `card_tags`
//!   enforces it and a duplicate insert is a no-op, not an error.
//! - Check and insert run on the caller's agent, so inside one transaction
//!   they observe the same snapshot.

use super::BoardResult;
use crate::db::Agent;
use crate::model::board::EntityId;
use rusqlite::params;

/// Links `tag_id` to `card_id`. Returns `true` when a new row was written.
///
/// # Errors
/// - `Store` when the card or tag does not exist (foreign key violation).
pub fn link(agent: &Agent<'_>, card_id: &str, tag_id: &str) -> BoardResult<bool> {
    if is_linked(agent, card_id, tag_id)? {
        return Ok(false);
    }
    let inserted = agent.exec(
        "INSERT INTO card_tags (card_id, tag_id)
         VALUES (?1, ?2)
         ON CONFLICT (card_id, tag_id) DO NOTHING;",
        params![card_id, tag_id],
    )?;
    Ok(inserted > 0)
}

/// Links every id in `tag_ids`; duplicates in the input are harmless.
pub fn link_all(agent: &Agent<'_>, card_id: &str, tag_ids: &[EntityId]) -> BoardResult<usize> {
    let mut added = 0;
    for tag_id in tag_ids {
        if link(agent, card_id, tag_id)? {
            added += 1;
        }
    }
    Ok(added)
}

/// Removes the link if present. Returns `true` when a row was deleted.
pub fn unlink(agent: &Agent<'_>, card_id: &str, tag_id: &str) -> BoardResult<bool> {
    let removed = agent.exec(
        "DELETE FROM card_tags WHERE card_id = ?1 AND tag_id = ?2;",
        params![card_id, tag_id],
    )?;
    Ok(removed > 0)
}

pub fn is_linked(agent: &Agent<'_>, card_id: &str, tag_id: &str) -> BoardResult<bool> {
    let exists: i64 = agent.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM card_tags WHERE card_id = ?1 AND tag_id = ?2
        );",
        params![card_id, tag_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
