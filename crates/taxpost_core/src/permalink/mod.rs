//! Hierarchical permalink engine.
//!
//! # Responsibility
//! - Generate `base/ancestors/term/separator/item/` links for registered
//!   item types.
//! - Recover the encoded term slug from an inbound URL.
//! - Derive host route rules from registrations.
//!
//! # Invariants
//! - Generation and recovery are independent: recovery never consults the
//!   item's associations, the URL is authoritative.
//! - Existence checks are memoized per pass only (`TermExistenceCache`).
//! - Only corrupted ancestor data surfaces as an error; every other mismatch
//!   degrades to the fallback link or `None`.

use crate::config::SiteConfig;
use crate::model::term::{HierarchyConfig, TermId};
use crate::registry::Registration;
use crate::repo::item_repo::ItemRepoError;
use crate::repo::term_repo::TermRepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod ancestors;
pub mod cache;
pub mod canonical;
pub mod recover;
pub mod render;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

pub use ancestors::{build_term_path, TermPath, MAX_TERM_DEPTH};
pub use cache::TermExistenceCache;
pub use canonical::{normalize_browsed_hint, resolve_canonical_term, CanonicalTerm};
pub use recover::recover_term;
pub use render::{attachment_link, render_permalink, RenderOptions, ITEM_SLUG_PLACEHOLDER};
pub use routes::{
    build_routes, split_hierarchy_query, RouteError, RouteMatch, RouteRule, RouteTable,
};

pub type PermalinkResult<T> = Result<T, PermalinkError>;

/// Errors surfaced by the permalink engine.
#[derive(Debug)]
pub enum PermalinkError {
    /// Ancestor chain revisits a term or is deeper than `MAX_TERM_DEPTH`.
    CycleDetected { term_uuid: TermId, depth: usize },
    /// An ancestor id does not resolve to a stored term.
    MissingAncestor {
        term_uuid: TermId,
        ancestor_uuid: TermId,
    },
    /// Term store transport failure.
    Store(TermRepoError),
    /// Item repository transport failure.
    Items(ItemRepoError),
}

impl PermalinkError {
    /// Whether the error indicates corrupted hierarchy data.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected { .. } | Self::MissingAncestor { .. }
        )
    }
}

impl Display for PermalinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected { term_uuid, depth } => write!(
                f,
                "ancestor chain of term {term_uuid} is cyclic or too deep (depth {depth})"
            ),
            Self::MissingAncestor {
                term_uuid,
                ancestor_uuid,
            } => write!(
                f,
                "ancestor {ancestor_uuid} of term {term_uuid} does not exist"
            ),
            Self::Store(err) => write!(f, "{err}"),
            Self::Items(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PermalinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Items(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TermRepoError> for PermalinkError {
    fn from(value: TermRepoError) -> Self {
        Self::Store(value)
    }
}

impl From<ItemRepoError> for PermalinkError {
    fn from(value: ItemRepoError) -> Self {
        Self::Items(value)
    }
}

/// Inputs shared by rendering and recovery for one registered item type.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub site: &'a SiteConfig,
    pub registration: &'a Registration,
    pub hierarchy: &'a HierarchyConfig,
}

impl<'a> LinkContext<'a> {
    pub fn new(
        site: &'a SiteConfig,
        registration: &'a Registration,
        hierarchy: &'a HierarchyConfig,
    ) -> Self {
        Self {
            site,
            registration,
            hierarchy,
        }
    }

    /// `home_url + base_slug + "/"`, the prefix every item link starts with.
    pub fn base_prefix(&self) -> String {
        let base = self.hierarchy.trimmed_base_slug();
        if base.is_empty() {
            self.site.home_url()
        } else {
            format!("{}{base}/", self.site.home_url())
        }
    }
}
