//! Hierarchy and term model.
//!
//! # Responsibility
//! - Describe one classification hierarchy and its URL configuration.
//! - Describe one term node inside a hierarchy.
//!
//! # Invariants
//! - `slug` is unique within one hierarchy.
//! - `parent_uuid` chains are acyclic (enforced by the authoring side).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable term identifier.
pub type TermId = Uuid;

/// Slug used when an item has no term association.
pub const UNCATEGORIZED_SLUG: &str = "uncategorized";

/// URL configuration of one classification hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Hierarchy identifier, e.g. `product_cat`.
    pub hierarchy_id: String,
    /// Root URL path segment, e.g. `shop`.
    pub base_slug: String,
    /// Query variable the host binds the term path to.
    pub query_var: String,
}

impl HierarchyConfig {
    pub fn new(
        hierarchy_id: impl Into<String>,
        base_slug: impl Into<String>,
        query_var: impl Into<String>,
    ) -> Self {
        Self {
            hierarchy_id: hierarchy_id.into(),
            base_slug: base_slug.into(),
            query_var: query_var.into(),
        }
    }

    /// Base slug without surrounding slashes.
    pub fn trimmed_base_slug(&self) -> &str {
        self.base_slug.trim_matches('/')
    }
}

/// One node of a classification hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Stable term id.
    pub term_uuid: TermId,
    /// Owning hierarchy id.
    pub hierarchy_id: String,
    /// URL slug.
    pub slug: String,
    /// Parent term id. `None` means root-level term.
    pub parent_uuid: Option<TermId>,
}

impl Term {
    /// Creates a root-level term with a generated id.
    pub fn new(hierarchy_id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            term_uuid: Uuid::new_v4(),
            hierarchy_id: hierarchy_id.into(),
            slug: slug.into(),
            parent_uuid: None,
        }
    }

    /// Returns a copy placed under `parent`.
    pub fn with_parent(mut self, parent: TermId) -> Self {
        self.parent_uuid = Some(parent);
        self
    }
}
