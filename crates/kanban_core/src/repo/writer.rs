//! Single-row inserts, updates and deletes for board entities.
//!
//! # Responsibility
//! - Own the write SQL for every board table.
//! - Stamp `updated_at` and actor columns.
//!
//! # Invariants
//! - Functions return the affected row count; callers translate zero into
//!   `NotFound` or `NoEffect`.
//! - Sibling order arithmetic lives in [`super::ordering`], not here.

use super::BoardResult;
use crate::db::Agent;
use crate::model::board::new_entity_id;
use rusqlite::params;

/// Inserts a project unless the id is taken. Returns `0` on id collision.
pub fn insert_project(
    agent: &Agent<'_>,
    id: &str,
    name: &str,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "INSERT INTO projects (id, name, created_by, updated_by)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT (id) DO NOTHING;",
        params![id, name, actor],
    )?;
    Ok(changed)
}

pub fn update_project_name(
    agent: &Agent<'_>,
    id: &str,
    name: &str,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "UPDATE projects
         SET name = ?2,
             updated_by = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![id, name, actor],
    )?;
    Ok(changed)
}

/// Deletes a project; columns, cards, tags and links cascade.
pub fn delete_project(agent: &Agent<'_>, id: &str) -> BoardResult<usize> {
    let changed = agent.exec("DELETE FROM projects WHERE id = ?1;", [id])?;
    Ok(changed)
}

pub fn insert_column(
    agent: &Agent<'_>,
    id: &str,
    project_id: &str,
    name: &str,
    order: i64,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "INSERT INTO board_columns (id, project_id, name, draw_order, created_by, updated_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
        params![id, project_id, name, order, actor],
    )?;
    Ok(changed)
}

pub fn update_column_name(
    agent: &Agent<'_>,
    id: &str,
    name: &str,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "UPDATE board_columns
         SET name = ?2,
             updated_by = ?3,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![id, name, actor],
    )?;
    Ok(changed)
}

/// Deletes a column; its cards and their links cascade.
pub fn delete_column(agent: &Agent<'_>, id: &str) -> BoardResult<usize> {
    let changed = agent.exec("DELETE FROM board_columns WHERE id = ?1;", [id])?;
    Ok(changed)
}

pub fn insert_card(
    agent: &Agent<'_>,
    id: &str,
    column_id: &str,
    name: &str,
    description: &str,
    order: i64,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "INSERT INTO cards (id, column_id, name, description, draw_order, created_by, updated_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
        params![id, column_id, name, description, order, actor],
    )?;
    Ok(changed)
}

pub fn update_card_fields(
    agent: &Agent<'_>,
    id: &str,
    name: &str,
    description: &str,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "UPDATE cards
         SET name = ?2,
             description = ?3,
             updated_by = ?4,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![id, name, description, actor],
    )?;
    Ok(changed)
}

/// Deletes a card; its links and change records cascade.
pub fn delete_card(agent: &Agent<'_>, id: &str) -> BoardResult<usize> {
    let changed = agent.exec("DELETE FROM cards WHERE id = ?1;", [id])?;
    Ok(changed)
}

pub fn insert_tag(
    agent: &Agent<'_>,
    id: &str,
    project_id: &str,
    name: &str,
    color: &str,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "INSERT INTO tags (id, project_id, name, color, created_by, updated_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
        params![id, project_id, name, color, actor],
    )?;
    Ok(changed)
}

pub fn update_tag(
    agent: &Agent<'_>,
    id: &str,
    name: &str,
    color: &str,
    actor: Option<&str>,
) -> BoardResult<usize> {
    let changed = agent.exec(
        "UPDATE tags
         SET name = ?2,
             color = ?3,
             updated_by = ?4,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![id, name, color, actor],
    )?;
    Ok(changed)
}

/// Deletes a tag; its card links cascade.
pub fn delete_tag(agent: &Agent<'_>, id: &str) -> BoardResult<usize> {
    let changed = agent.exec("DELETE FROM tags WHERE id = ?1;", [id])?;
    Ok(changed)
}

/// Appends one card change record. Values are JSON objects of changed fields.
pub fn insert_card_update(
    agent: &Agent<'_>,
    card_id: &str,
    old_values: &serde_json::Value,
    new_values: &serde_json::Value,
    actor: Option<&str>,
) -> BoardResult<()> {
    agent.exec(
        "INSERT INTO card_updates (id, card_id, old_values, new_values, updated_by)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            new_entity_id(),
            card_id,
            old_values.to_string(),
            new_values.to_string(),
            actor,
        ],
    )?;
    Ok(())
}
