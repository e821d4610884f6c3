//! Write payloads accepted by the board service.
//!
//! Payloads deserialize from the same camelCase JSON the tree serializes to,
//! so a tree read back from the store can be edited and sent as an update.

use super::board::EntityId;
use serde::{Deserialize, Serialize};

/// Full project payload for create and upsert-update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<TagInput>,
    #[serde(default)]
    pub columns: Vec<ColumnInput>,
}

/// Tag payload.
///
/// On create, `id` is only a reference key that card `tag_ids` may use; the
/// stored tag gets a fresh id. On update, `id` selects the row to upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInput {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub name: String,
    /// Explicit insert position; `None` appends.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub cards: Vec<CardInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Explicit insert position; `None` appends.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<EntityId>,
}

/// Card edit. A different `column_id` relocates the card to the tail of
/// that column; `order` is then ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    pub column_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: Option<i64>,
}

impl ProjectInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: TagInput) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_column(mut self, column: ColumnInput) -> Self {
        self.columns.push(column);
        self
    }
}

impl TagInput {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl ColumnInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_card(mut self, card: CardInput) -> Self {
        self.cards.push(card);
        self
    }
}

impl CardInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_tag_ids<I, S>(mut self, tag_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        self.tag_ids = tag_ids.into_iter().map(Into::into).collect();
        self
    }
}
