//! Wire-format models shared by the HTTP layer and the reorder core.
//!
//! These are the JSON shapes the REST API serves and the drag-and-drop
//! client consumes; field names are snake_case, exactly as the rows come
//! out of the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tag as nested inside a link, carrying the link's rank *within this
/// tag's sublist* (not the tag's own rank).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTagRef {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub url: String,
    pub icon_url: Option<String>,
    /// Global rank.
    pub order_index: i32,
    #[serde(default)]
    pub tags: Vec<LinkTagRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    pub fn tag_rank(&self, tag_id: i32) -> Option<i32> {
        self.tags.iter().find(|t| t.id == tag_id).map(|t| t.order_index)
    }

    pub fn has_tag(&self, tag_id: i32) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub color: String,
    /// Rank of the tag section among the user's tags.
    pub order_index: i32,
    pub tab_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<super::entities::tag::Model> for Tag {
    fn from(m: super::entities::tag::Model) -> Self {
        Tag {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            color: m.color,
            order_index: m.order_index,
            tab_id: m.tab_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<super::entities::tab::Model> for Tab {
    fn from(m: super::entities::tab::Model) -> Self {
        Tab {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            order_index: m.order_index,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
