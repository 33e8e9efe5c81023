//! Item model.
//!
//! # Responsibility
//! - Carry the item fields read at render/resolve time.
//! - Map publication status to and from its stored form.
//!
//! # Invariants
//! - Only `Published`-like items receive hierarchical permalinks;
//!   `Draft` and `Pending` keep their fallback link.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable item identifier.
pub type ItemId = Uuid;

/// Publication status of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Draft,
    Pending,
    Published,
    /// Any other host status (`private`, `future`, ...). Treated as linkable.
    Other(String),
}

impl ItemStatus {
    /// Stable string stored in `items.status`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Other(value) => value.as_str(),
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "draft" => Self::Draft,
            "pending" => Self::Pending,
            "published" | "publish" => Self::Published,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether an item in this status gets a hierarchical permalink.
    pub fn allows_hierarchical_link(&self) -> bool {
        !matches!(self, Self::Draft | Self::Pending)
    }
}

/// Content item addressed by a permalink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable item id.
    pub item_uuid: ItemId,
    /// Registered item type id, e.g. `product`.
    pub item_type: String,
    /// URL slug of the item itself.
    pub slug: String,
    pub status: ItemStatus,
    /// Parent item, set for attachments.
    pub parent_uuid: Option<ItemId>,
    /// Epoch ms publication timestamp; orders adjacent navigation.
    pub published_at: i64,
}

impl Item {
    /// Creates a published item with a generated id.
    pub fn new(item_type: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            item_uuid: Uuid::new_v4(),
            item_type: item_type.into(),
            slug: slug.into(),
            status: ItemStatus::Published,
            parent_uuid: None,
            published_at: 0,
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_parent(mut self, parent: ItemId) -> Self {
        self.parent_uuid = Some(parent);
        self
    }

    pub fn with_published_at(mut self, published_at: i64) -> Self {
        self.published_at = published_at;
        self
    }
}
