//! Root-first slug paths for canonical terms.

use super::canonical::CanonicalTerm;
use super::{PermalinkError, PermalinkResult};
use crate::model::term::UNCATEGORIZED_SLUG;
use crate::repo::term_repo::TermStore;
use log::error;
use std::collections::HashSet;

/// Deepest ancestor chain accepted before the data is treated as cyclic.
pub const MAX_TERM_DEPTH: usize = 64;

/// Ordered slugs from hierarchy root to the chosen term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPath {
    slugs: Vec<String>,
}

impl TermPath {
    pub fn uncategorized() -> Self {
        Self {
            slugs: vec![UNCATEGORIZED_SLUG.to_string()],
        }
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    /// Slug of the chosen term itself.
    pub fn leaf(&self) -> &str {
        self.slugs.last().map(String::as_str).unwrap_or(UNCATEGORIZED_SLUG)
    }

    /// `/`-joined path, e.g. `tools/power/drills`.
    pub fn joined(&self) -> String {
        self.slugs.join("/")
    }
}

/// Walks the parent chain of `canonical` and renders it root-first.
///
/// # Errors
/// - `CycleDetected` when the chain revisits a term or is deeper than
///   `MAX_TERM_DEPTH`.
/// - `MissingAncestor` when an ancestor id has no stored term or names a
///   term of another hierarchy.
/// - `Store` on term store failures.
pub fn build_term_path<S: TermStore>(
    store: &S,
    canonical: CanonicalTerm<'_>,
) -> PermalinkResult<TermPath> {
    let term = match canonical {
        CanonicalTerm::Term(term) => term,
        CanonicalTerm::Uncategorized => return Ok(TermPath::uncategorized()),
    };

    let ancestor_ids = store.ancestors(term.term_uuid, &term.hierarchy_id, MAX_TERM_DEPTH + 1)?;
    if ancestor_ids.len() > MAX_TERM_DEPTH {
        error!(
            "event=term_path module=permalink status=error error_code=depth_exceeded term={} depth={}",
            term.term_uuid,
            ancestor_ids.len()
        );
        return Err(PermalinkError::CycleDetected {
            term_uuid: term.term_uuid,
            depth: ancestor_ids.len(),
        });
    }

    let mut visited = HashSet::from([term.term_uuid]);
    let mut slugs = Vec::with_capacity(ancestor_ids.len() + 1);
    slugs.push(term.slug.clone());
    for (index, ancestor_uuid) in ancestor_ids.into_iter().enumerate() {
        if !visited.insert(ancestor_uuid) {
            error!(
                "event=term_path module=permalink status=error error_code=cycle_detected term={} depth={}",
                term.term_uuid,
                index + 1
            );
            return Err(PermalinkError::CycleDetected {
                term_uuid: term.term_uuid,
                depth: index + 1,
            });
        }
        let ancestor = store
            .get_term(ancestor_uuid)?
            .filter(|ancestor| ancestor.hierarchy_id == term.hierarchy_id);
        let Some(ancestor) = ancestor else {
            error!(
                "event=term_path module=permalink status=error error_code=missing_ancestor term={} ancestor={}",
                term.term_uuid, ancestor_uuid
            );
            return Err(PermalinkError::MissingAncestor {
                term_uuid: term.term_uuid,
                ancestor_uuid,
            });
        };
        slugs.push(ancestor.slug);
    }
    slugs.reverse();

    Ok(TermPath { slugs })
}
