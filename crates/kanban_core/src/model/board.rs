//! Persisted board entities and the hydrated project tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque primary key shared by every board entity.
pub type EntityId = String;

/// Generates a fresh entity id.
pub fn new_entity_id() -> EntityId {
    Uuid::new_v4().to_string()
}

/// Audit columns present on every entity row.
///
/// Timestamps are epoch milliseconds assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMeta {
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Root of ownership for columns and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: EntityId,
    pub name: String,
    #[serde(flatten)]
    pub audit: AuditMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: EntityId,
    pub project_id: EntityId,
    pub name: String,
    /// Position among the project's columns.
    pub order: i64,
    #[serde(flatten)]
    pub audit: AuditMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: EntityId,
    pub column_id: EntityId,
    pub name: String,
    pub description: String,
    /// Position among the column's cards.
    pub order: i64,
    #[serde(flatten)]
    pub audit: AuditMeta,
}

/// Project-owned label; cards reference tags through `card_tags` links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: EntityId,
    pub project_id: EntityId,
    pub name: String,
    pub color: String,
    #[serde(flatten)]
    pub audit: AuditMeta,
}

/// Changed-field snapshot written by card updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdateRecord {
    pub id: EntityId,
    pub card_id: EntityId,
    /// Previous values of the changed fields only.
    pub old_values: serde_json::Value,
    /// New values of the same fields.
    pub new_values: serde_json::Value,
    pub updated_at: i64,
    pub updated_by: Option<String>,
}

/// Id and assigned position of a newly created sibling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: EntityId,
    pub order: i64,
}

/// Fully hydrated project: tags plus columns → cards → tag ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTree {
    pub id: EntityId,
    pub name: String,
    pub tags: Vec<Tag>,
    /// Sorted by `order` ascending.
    pub columns: Vec<ColumnTree>,
    #[serde(flatten)]
    pub audit: AuditMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnTree {
    pub id: EntityId,
    pub name: String,
    pub order: i64,
    /// Sorted by `order` ascending.
    pub cards: Vec<CardTree>,
    #[serde(flatten)]
    pub audit: AuditMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTree {
    pub id: EntityId,
    pub column_id: EntityId,
    pub name: String,
    pub order: i64,
    pub description: String,
    pub tag_ids: Vec<EntityId>,
    #[serde(flatten)]
    pub audit: AuditMeta,
}

impl ProjectTree {
    /// Finds a column by id.
    pub fn column(&self, id: &str) -> Option<&ColumnTree> {
        self.columns.iter().find(|column| column.id == id)
    }
}

impl ColumnTree {
    pub(crate) fn from_column(column: Column, cards: Vec<CardTree>) -> Self {
        Self {
            id: column.id,
            name: column.name,
            order: column.order,
            cards,
            audit: column.audit,
        }
    }

    /// Finds a card by id.
    pub fn card(&self, id: &str) -> Option<&CardTree> {
        self.cards.iter().find(|card| card.id == id)
    }
}

impl CardTree {
    pub(crate) fn from_card(card: Card, tag_ids: Vec<EntityId>) -> Self {
        Self {
            id: card.id,
            column_id: card.column_id,
            name: card.name,
            order: card.order,
            description: card.description,
            tag_ids,
            audit: card.audit,
        }
    }
}
