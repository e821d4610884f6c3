//! Hierarchy reads and typed row decoding.
//!
//! # Responsibility
//! - Decode entity rows through one fixed field-to-column mapping per entity.
//! - Hydrate a project into its nested tree.
//!
//! # Invariants
//! - Column and card lists are ordered `draw_order ASC, id ASC`.
//! - Single-row reads by id report `NotFound` instead of `Ok(None)`.
//! - Each tree level issues one query scoped to its immediate parent.

use super::{BoardError, BoardResult, EntityKind};
use crate::db::Agent;
use crate::model::board::{
    AuditMeta, Card, CardTree, CardUpdateRecord, Column, ColumnTree, EntityId, Project,
    ProjectTree, Tag,
};
use rusqlite::{OptionalExtension, Row};

/// Entity with a fixed select list and typed row decoding.
pub trait RowEntity: Sized {
    const KIND: EntityKind;
    /// `SELECT <columns> FROM <table>` without filter or terminator.
    const SELECT: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditMeta> {
    Ok(AuditMeta {
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
    })
}

impl RowEntity for Project {
    const KIND: EntityKind = EntityKind::Project;
    const SELECT: &'static str = "SELECT
        id, name, created_at, updated_at, created_by, updated_by
     FROM projects";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            audit: audit_from_row(row)?,
        })
    }
}

impl RowEntity for Column {
    const KIND: EntityKind = EntityKind::Column;
    const SELECT: &'static str = "SELECT
        id, project_id, name, draw_order, created_at, updated_at, created_by, updated_by
     FROM board_columns";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            name: row.get("name")?,
            order: row.get("draw_order")?,
            audit: audit_from_row(row)?,
        })
    }
}

impl RowEntity for Card {
    const KIND: EntityKind = EntityKind::Card;
    const SELECT: &'static str = "SELECT
        id, column_id, name, description, draw_order,
        created_at, updated_at, created_by, updated_by
     FROM cards";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            column_id: row.get("column_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            order: row.get("draw_order")?,
            audit: audit_from_row(row)?,
        })
    }
}

impl RowEntity for Tag {
    const KIND: EntityKind = EntityKind::Tag;
    const SELECT: &'static str = "SELECT
        id, project_id, name, color, created_at, updated_at, created_by, updated_by
     FROM tags";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            name: row.get("name")?,
            color: row.get("color")?,
            audit: audit_from_row(row)?,
        })
    }
}

/// Loads one entity by id.
pub fn read_by_id<T: RowEntity>(agent: &Agent<'_>, id: &str) -> BoardResult<T> {
    let sql = format!("{} WHERE id = ?1;", T::SELECT);
    let mut stmt = agent.prepare(&sql)?;
    let found = stmt.query_row([id], T::from_row).optional()?;
    found.ok_or_else(|| BoardError::not_found(T::KIND, id))
}

/// Loads entities matching `filter` (a `WHERE ... ORDER BY ...` tail).
fn read_where<T: RowEntity>(agent: &Agent<'_>, filter: &str, key: &str) -> BoardResult<Vec<T>> {
    let sql = format!("{} {filter};", T::SELECT);
    let mut stmt = agent.prepare(&sql)?;
    let rows = stmt.query_map([key], T::from_row)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn read_project(agent: &Agent<'_>, id: &str) -> BoardResult<Project> {
    read_by_id(agent, id)
}

pub fn read_column(agent: &Agent<'_>, id: &str) -> BoardResult<Column> {
    read_by_id(agent, id)
}

pub fn read_card(agent: &Agent<'_>, id: &str) -> BoardResult<Card> {
    read_by_id(agent, id)
}

pub fn read_tag(agent: &Agent<'_>, id: &str) -> BoardResult<Tag> {
    read_by_id(agent, id)
}

/// Tags of one project in creation order.
pub fn read_tags_by_project(agent: &Agent<'_>, project_id: &str) -> BoardResult<Vec<Tag>> {
    read_where(
        agent,
        "WHERE project_id = ?1 ORDER BY created_at ASC, rowid ASC",
        project_id,
    )
}

pub fn read_columns_by_project(agent: &Agent<'_>, project_id: &str) -> BoardResult<Vec<Column>> {
    read_where(
        agent,
        "WHERE project_id = ?1 ORDER BY draw_order ASC, id ASC",
        project_id,
    )
}

pub fn read_cards_by_column(agent: &Agent<'_>, column_id: &str) -> BoardResult<Vec<Card>> {
    read_where(
        agent,
        "WHERE column_id = ?1 ORDER BY draw_order ASC, id ASC",
        column_id,
    )
}

/// Tag ids linked to one card, in link order.
pub fn read_tag_ids_by_card(agent: &Agent<'_>, card_id: &str) -> BoardResult<Vec<EntityId>> {
    let mut stmt = agent.prepare(
        "SELECT tag_id
         FROM card_tags
         WHERE card_id = ?1
         ORDER BY rowid ASC;",
    )?;
    let rows = stmt.query_map([card_id], |row| row.get::<_, String>(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Change records of one card, oldest first.
pub fn read_card_history(agent: &Agent<'_>, card_id: &str) -> BoardResult<Vec<CardUpdateRecord>> {
    let mut stmt = agent.prepare(
        "SELECT id, card_id, old_values, new_values, updated_at, updated_by
         FROM card_updates
         WHERE card_id = ?1
         ORDER BY updated_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([card_id])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let old_values: String = row.get("old_values")?;
        let new_values: String = row.get("new_values")?;
        records.push(CardUpdateRecord {
            id: row.get("id")?,
            card_id: row.get("card_id")?,
            old_values: serde_json::from_str(&old_values)?,
            new_values: serde_json::from_str(&new_values)?,
            updated_at: row.get("updated_at")?,
            updated_by: row.get("updated_by")?,
        });
    }
    Ok(records)
}

/// Hydrates project → tags and project → columns → cards → tag ids.
///
/// # Errors
/// - `NotFound` when no project row matches `id`.
pub fn get_project_tree(agent: &Agent<'_>, id: &str) -> BoardResult<ProjectTree> {
    let project = read_project(agent, id)?;
    let tags = read_tags_by_project(agent, id)?;

    let mut columns = Vec::new();
    for column in read_columns_by_project(agent, id)? {
        let mut cards = Vec::new();
        for card in read_cards_by_column(agent, &column.id)? {
            let tag_ids = read_tag_ids_by_card(agent, &card.id)?;
            cards.push(CardTree::from_card(card, tag_ids));
        }
        columns.push(ColumnTree::from_column(column, cards));
    }

    Ok(ProjectTree {
        id: project.id,
        name: project.name,
        tags,
        columns,
        audit: project.audit,
    })
}
