//! Board use-case service.
//!
//! # Responsibility
//! - Compose agent, ordering engine, tag linker and reader into project,
//!   column, card and tag use cases.
//! - Run every write use case inside one immediate transaction and every
//!   multi-query read inside one deferred snapshot.
//!
//! # Invariants
//! - The first error of any kind rolls back the whole operation and is
//!   returned unchanged; no partial hierarchy is ever committed.
//! - Delete paths read the row first, close its gap, then delete.
//! - A card or column moves only within one project.
//! - Tags linked to a card belong to the card's project.

use crate::db::{read_in_snapshot, run_in_transaction, Agent};
use crate::model::board::{
    new_entity_id, Card, CardUpdateRecord, Column, EntityId, Placement, ProjectTree,
};
use crate::model::input::{CardInput, CardUpdate, ColumnInput, ProjectInput, TagInput};
use crate::repo::ordering::{self, SiblingScope};
use crate::repo::{reader, tag_link, writer, BoardError, BoardResult, EntityKind};
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Client-side tag reference → stored tag id, scoped to one operation.
type TagRefs = HashMap<String, EntityId>;

/// Board service facade over one injected connection.
pub struct BoardService<'conn> {
    conn: &'conn Connection,
    actor: Option<String>,
}

impl<'conn> BoardService<'conn> {
    /// Creates a service over a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn, actor: None }
    }

    /// Records `actor` in `created_by`/`updated_by` on every write.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    /// Creates a project tree under a fresh id and returns that id.
    pub fn create_project(&self, input: &ProjectInput) -> BoardResult<EntityId> {
        self.create_project_with_id(&new_entity_id(), input)
    }

    /// Creates a project tree under a caller-chosen id.
    ///
    /// Tags, columns and cards always receive fresh ids. Tag input ids act as
    /// reference keys for card `tag_ids` inside the same payload.
    ///
    /// # Errors
    /// - `NoEffect` when `id` is already taken; nothing is persisted.
    /// - `InvalidName` when any name in the tree is blank.
    pub fn create_project_with_id(&self, id: &str, input: &ProjectInput) -> BoardResult<EntityId> {
        validate_project_input(input)?;
        run_in_transaction(self.conn, "create_project", |agent| {
            let name = normalize_name(&input.name, EntityKind::Project)?;
            if writer::insert_project(agent, id, &name, self.actor())? == 0 {
                return Err(BoardError::NoEffect {
                    operation: "create_project",
                });
            }

            let mut tag_refs = TagRefs::new();
            for tag in &input.tags {
                let tag_id = self.insert_tag(agent, id, tag, new_entity_id())?;
                if let Some(reference) = &tag.id {
                    tag_refs.insert(reference.clone(), tag_id);
                }
            }

            for column in &input.columns {
                let placement = self.insert_column(agent, id, column, new_entity_id())?;
                for card in &column.cards {
                    self.insert_card(agent, id, &placement.id, card, new_entity_id(), &tag_refs)?;
                }
            }

            Ok(id.to_string())
        })
    }

    /// Reads the fully hydrated project tree from one committed snapshot.
    pub fn get_project_tree(&self, id: &str) -> BoardResult<ProjectTree> {
        read_in_snapshot(self.conn, |agent| reader::get_project_tree(agent, id))
    }

    /// Upserts a project tree.
    ///
    /// Nothing absent from `input` is deleted. Existing rows keep their order
    /// unless the payload names a different one.
    ///
    /// # Errors
    /// - `NoEffect` when the project row does not exist, or when a payload id
    ///   belongs to another project.
    pub fn update_project(&self, id: &str, input: &ProjectInput) -> BoardResult<()> {
        validate_project_input(input)?;
        run_in_transaction(self.conn, "update_project", |agent| {
            let name = normalize_name(&input.name, EntityKind::Project)?;
            if writer::update_project_name(agent, id, &name, self.actor())? == 0 {
                return Err(BoardError::NoEffect {
                    operation: "update_project",
                });
            }

            let mut tag_refs = TagRefs::new();
            for tag in &input.tags {
                let tag_id = self.upsert_tag(agent, id, tag)?;
                if let Some(reference) = &tag.id {
                    tag_refs.insert(reference.clone(), tag_id);
                }
            }

            for column in &input.columns {
                let column_id = self.upsert_column(agent, id, column)?;
                for card in &column.cards {
                    self.upsert_card(agent, id, &column_id, card, &tag_refs)?;
                }
            }
            Ok(())
        })
    }

    /// Renames a project without touching its children.
    pub fn rename_project(&self, id: &str, name: &str) -> BoardResult<()> {
        let name = normalize_name(name, EntityKind::Project)?;
        run_in_transaction(self.conn, "rename_project", |agent| {
            if writer::update_project_name(agent, id, &name, self.actor())? == 0 {
                return Err(BoardError::not_found(EntityKind::Project, id));
            }
            Ok(())
        })
    }

    /// Deletes a project; the store cascades to columns, cards, tags and links.
    pub fn delete_project(&self, id: &str) -> BoardResult<()> {
        run_in_transaction(self.conn, "delete_project", |agent| {
            if writer::delete_project(agent, id)? == 0 {
                return Err(BoardError::not_found(EntityKind::Project, id));
            }
            Ok(())
        })
    }

    /// Creates a column at the tail, or at `position` when given.
    pub fn create_column(
        &self,
        project_id: &str,
        name: &str,
        position: Option<i64>,
    ) -> BoardResult<Placement> {
        let input = ColumnInput {
            order: position,
            ..ColumnInput::new(name)
        };
        run_in_transaction(self.conn, "create_column", |agent| {
            reader::read_project(agent, project_id)?;
            self.insert_column(agent, project_id, &input, new_entity_id())
        })
    }

    /// Renames a column and, when `order` is given, moves it inside its project.
    pub fn update_column_data(
        &self,
        id: &str,
        name: &str,
        order: Option<i64>,
    ) -> BoardResult<Column> {
        let name = normalize_name(name, EntityKind::Column)?;
        run_in_transaction(self.conn, "update_column_data", |agent| {
            let existing = reader::read_column(agent, id)?;
            writer::update_column_name(agent, id, &name, self.actor())?;
            if let Some(requested) = order.filter(|value| *value != existing.order) {
                ordering::reorder_within(
                    agent,
                    SiblingScope::Columns,
                    &existing.project_id,
                    id,
                    existing.order,
                    requested,
                )?;
            }
            reader::read_column(agent, id)
        })
    }

    /// Deletes a column and closes the gap it leaves among its siblings.
    pub fn delete_column(&self, id: &str) -> BoardResult<()> {
        run_in_transaction(self.conn, "delete_column", |agent| {
            let column = reader::read_column(agent, id)?;
            ordering::close_gap(agent, SiblingScope::Columns, &column.project_id, column.order)?;
            writer::delete_column(agent, id)?;
            Ok(())
        })
    }

    /// Creates a card at the tail of `column_id` (or at `input.order`) and
    /// links its tags.
    pub fn create_card(&self, column_id: &str, input: &CardInput) -> BoardResult<Placement> {
        normalize_name(&input.name, EntityKind::Card)?;
        run_in_transaction(self.conn, "create_card", |agent| {
            let column = reader::read_column(agent, column_id)?;
            self.insert_card(
                agent,
                &column.project_id,
                column_id,
                input,
                new_entity_id(),
                &TagRefs::new(),
            )
        })
    }

    /// Edits a card. A different `column_id` relocates it to the tail of the
    /// target column; otherwise a different `order` reorders it in place.
    ///
    /// # Errors
    /// - `NotFound` for a missing card or target column.
    /// - `NoEffect` when the target column belongs to another project.
    pub fn update_card(&self, id: &str, update: &CardUpdate) -> BoardResult<Card> {
        let name = normalize_name(&update.name, EntityKind::Card)?;
        run_in_transaction(self.conn, "update_card", |agent| {
            let existing = reader::read_card(agent, id)?;
            if update.column_id != existing.column_id {
                self.ensure_same_project(
                    agent,
                    &existing.column_id,
                    &update.column_id,
                    "update_card",
                )?;
            }
            self.apply_card_change(
                agent,
                &existing,
                &update.column_id,
                &name,
                &update.description,
                update.order,
            )
        })
    }

    /// Deletes a card and closes the gap it leaves in its column.
    pub fn delete_card(&self, id: &str) -> BoardResult<()> {
        run_in_transaction(self.conn, "delete_card", |agent| {
            let card = reader::read_card(agent, id)?;
            ordering::close_gap(agent, SiblingScope::Cards, &card.column_id, card.order)?;
            writer::delete_card(agent, id)?;
            Ok(())
        })
    }

    pub fn create_tag(&self, project_id: &str, name: &str, color: &str) -> BoardResult<EntityId> {
        let input = TagInput::new(name, color);
        run_in_transaction(self.conn, "create_tag", |agent| {
            reader::read_project(agent, project_id)?;
            self.insert_tag(agent, project_id, &input, new_entity_id())
        })
    }

    /// Deletes a tag; links to it cascade.
    pub fn delete_tag(&self, id: &str) -> BoardResult<()> {
        run_in_transaction(self.conn, "delete_tag", |agent| {
            if writer::delete_tag(agent, id)? == 0 {
                return Err(BoardError::not_found(EntityKind::Tag, id));
            }
            Ok(())
        })
    }

    /// Links a tag to a card. Returns `false` when the link already existed.
    pub fn link_tag(&self, card_id: &str, tag_id: &str) -> BoardResult<bool> {
        run_in_transaction(self.conn, "link_tag", |agent| {
            let card = reader::read_card(agent, card_id)?;
            let column = reader::read_column(agent, &card.column_id)?;
            self.link_card_tags(agent, &column.project_id, card_id, &[tag_id.to_string()])
                .map(|added| added > 0)
        })
    }

    /// Removes a card↔tag link. Returns `false` when there was none.
    pub fn unlink_tag(&self, card_id: &str, tag_id: &str) -> BoardResult<bool> {
        run_in_transaction(self.conn, "unlink_tag", |agent| {
            tag_link::unlink(agent, card_id, tag_id)
        })
    }

    /// Closes a gap at `order` under `parent_id` for callers that removed a
    /// sibling row directly. Returns how many siblings shifted.
    pub fn force_pop_order(
        &self,
        scope: SiblingScope,
        parent_id: &str,
        order: i64,
    ) -> BoardResult<usize> {
        run_in_transaction(self.conn, "force_pop_order", |agent| {
            ordering::close_gap(agent, scope, parent_id, order)
        })
    }

    /// Lists a card's change records, oldest first.
    pub fn card_history(&self, card_id: &str) -> BoardResult<Vec<CardUpdateRecord>> {
        read_in_snapshot(self.conn, |agent| {
            reader::read_card(agent, card_id)?;
            reader::read_card_history(agent, card_id)
        })
    }

    fn insert_tag(
        &self,
        agent: &Agent<'_>,
        project_id: &str,
        tag: &TagInput,
        tag_id: EntityId,
    ) -> BoardResult<EntityId> {
        let name = normalize_name(&tag.name, EntityKind::Tag)?;
        writer::insert_tag(agent, &tag_id, project_id, &name, &tag.color, self.actor())?;
        Ok(tag_id)
    }

    fn insert_column(
        &self,
        agent: &Agent<'_>,
        project_id: &str,
        column: &ColumnInput,
        column_id: EntityId,
    ) -> BoardResult<Placement> {
        let name = normalize_name(&column.name, EntityKind::Column)?;
        let order = ordering::reserve_slot(agent, SiblingScope::Columns, project_id, column.order)?;
        writer::insert_column(agent, &column_id, project_id, &name, order, self.actor())?;
        Ok(Placement {
            id: column_id,
            order,
        })
    }

    fn insert_card(
        &self,
        agent: &Agent<'_>,
        project_id: &str,
        column_id: &str,
        card: &CardInput,
        card_id: EntityId,
        tag_refs: &TagRefs,
    ) -> BoardResult<Placement> {
        let name = normalize_name(&card.name, EntityKind::Card)?;
        let order = ordering::reserve_slot(agent, SiblingScope::Cards, column_id, card.order)?;
        writer::insert_card(
            agent,
            &card_id,
            column_id,
            &name,
            &card.description,
            order,
            self.actor(),
        )?;
        let tag_ids = resolve_tag_ids(&card.tag_ids, tag_refs);
        self.link_card_tags(agent, project_id, &card_id, &tag_ids)?;
        Ok(Placement { id: card_id, order })
    }

    fn upsert_tag(&self, agent: &Agent<'_>, project_id: &str, tag: &TagInput) -> BoardResult<EntityId> {
        let Some(tag_id) = &tag.id else {
            return self.insert_tag(agent, project_id, tag, new_entity_id());
        };
        match optional(reader::read_tag(agent, tag_id))? {
            None => self.insert_tag(agent, project_id, tag, tag_id.clone()),
            Some(existing) if existing.project_id != project_id => Err(BoardError::NoEffect {
                operation: "update_project",
            }),
            Some(_) => {
                let name = normalize_name(&tag.name, EntityKind::Tag)?;
                writer::update_tag(agent, tag_id, &name, &tag.color, self.actor())?;
                Ok(tag_id.clone())
            }
        }
    }

    fn upsert_column(
        &self,
        agent: &Agent<'_>,
        project_id: &str,
        column: &ColumnInput,
    ) -> BoardResult<EntityId> {
        let Some(column_id) = &column.id else {
            return self
                .insert_column(agent, project_id, column, new_entity_id())
                .map(|placement| placement.id);
        };
        match optional(reader::read_column(agent, column_id))? {
            None => self
                .insert_column(agent, project_id, column, column_id.clone())
                .map(|placement| placement.id),
            Some(existing) if existing.project_id != project_id => Err(BoardError::NoEffect {
                operation: "update_project",
            }),
            Some(existing) => {
                let name = normalize_name(&column.name, EntityKind::Column)?;
                writer::update_column_name(agent, column_id, &name, self.actor())?;
                if let Some(requested) = column.order.filter(|value| *value != existing.order) {
                    ordering::reorder_within(
                        agent,
                        SiblingScope::Columns,
                        project_id,
                        column_id,
                        existing.order,
                        requested,
                    )?;
                }
                Ok(column_id.clone())
            }
        }
    }

    fn upsert_card(
        &self,
        agent: &Agent<'_>,
        project_id: &str,
        column_id: &str,
        card: &CardInput,
        tag_refs: &TagRefs,
    ) -> BoardResult<()> {
        let Some(card_id) = &card.id else {
            self.insert_card(agent, project_id, column_id, card, new_entity_id(), tag_refs)?;
            return Ok(());
        };
        match optional(reader::read_card(agent, card_id))? {
            None => {
                self.insert_card(agent, project_id, column_id, card, card_id.clone(), tag_refs)?;
            }
            Some(existing) => {
                if existing.column_id != column_id {
                    self.ensure_same_project(
                        agent,
                        &existing.column_id,
                        column_id,
                        "update_project",
                    )?;
                }
                let name = normalize_name(&card.name, EntityKind::Card)?;
                self.apply_card_change(
                    agent,
                    &existing,
                    column_id,
                    &name,
                    &card.description,
                    card.order,
                )?;
                let tag_ids = resolve_tag_ids(&card.tag_ids, tag_refs);
                self.link_card_tags(agent, project_id, card_id, &tag_ids)?;
            }
        }
        Ok(())
    }

    /// Applies field, column and order changes to an existing card and
    /// records the changed fields.
    fn apply_card_change(
        &self,
        agent: &Agent<'_>,
        existing: &Card,
        column_id: &str,
        name: &str,
        description: &str,
        requested_order: Option<i64>,
    ) -> BoardResult<Card> {
        if column_id != existing.column_id {
            ordering::relocate_card(
                agent,
                &existing.id,
                &existing.column_id,
                existing.order,
                column_id,
            )?;
        } else if let Some(requested) = requested_order.filter(|value| *value != existing.order) {
            ordering::reorder_within(
                agent,
                SiblingScope::Cards,
                column_id,
                &existing.id,
                existing.order,
                requested,
            )?;
        }
        writer::update_card_fields(agent, &existing.id, name, description, self.actor())?;

        let updated = reader::read_card(agent, &existing.id)?;
        if let Some((old_values, new_values)) = card_diff(existing, &updated) {
            writer::insert_card_update(agent, &existing.id, &old_values, &new_values, self.actor())?;
        }
        Ok(updated)
    }

    fn link_card_tags(
        &self,
        agent: &Agent<'_>,
        project_id: &str,
        card_id: &str,
        tag_ids: &[EntityId],
    ) -> BoardResult<usize> {
        for tag_id in tag_ids {
            let tag = reader::read_tag(agent, tag_id)?;
            if tag.project_id != project_id {
                return Err(BoardError::NoEffect {
                    operation: "link_tag",
                });
            }
        }
        tag_link::link_all(agent, card_id, tag_ids)
    }

    fn ensure_same_project(
        &self,
        agent: &Agent<'_>,
        from_column_id: &str,
        to_column_id: &str,
        operation: &'static str,
    ) -> BoardResult<()> {
        let from = reader::read_column(agent, from_column_id)?;
        let to = reader::read_column(agent, to_column_id)?;
        if from.project_id != to.project_id {
            return Err(BoardError::NoEffect { operation });
        }
        Ok(())
    }
}

fn normalize_name(value: &str, entity: EntityKind) -> BoardResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoardError::InvalidName(entity));
    }
    Ok(trimmed.to_string())
}

fn validate_project_input(input: &ProjectInput) -> BoardResult<()> {
    normalize_name(&input.name, EntityKind::Project)?;
    for tag in &input.tags {
        normalize_name(&tag.name, EntityKind::Tag)?;
    }
    for column in &input.columns {
        normalize_name(&column.name, EntityKind::Column)?;
        for card in &column.cards {
            normalize_name(&card.name, EntityKind::Card)?;
        }
    }
    Ok(())
}

fn resolve_tag_ids(tag_ids: &[EntityId], tag_refs: &TagRefs) -> Vec<EntityId> {
    tag_ids
        .iter()
        .map(|id| tag_refs.get(id).unwrap_or(id).clone())
        .collect()
}

/// Maps `NotFound` to `Ok(None)`.
fn optional<T>(result: BoardResult<T>) -> BoardResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(BoardError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Changed fields as (old, new) JSON objects; `None` when nothing changed.
fn card_diff(before: &Card, after: &Card) -> Option<(Value, Value)> {
    let mut old_values = Map::new();
    let mut new_values = Map::new();
    let mut record = |field: &str, old: Value, new: Value| {
        if old != new {
            old_values.insert(field.to_string(), old);
            new_values.insert(field.to_string(), new);
        }
    };
    record("name", Value::from(before.name.as_str()), Value::from(after.name.as_str()));
    record(
        "description",
        Value::from(before.description.as_str()),
        Value::from(after.description.as_str()),
    );
    record(
        "columnId",
        Value::from(before.column_id.as_str()),
        Value::from(after.column_id.as_str()),
    );
    record("order", Value::from(before.order), Value::from(after.order));

    if old_values.is_empty() {
        return None;
    }
    Some((Value::Object(old_values), Value::Object(new_values)))
}
