//! Per-pass memoization of term existence checks.
//!
//! # Invariants
//! - One instance serves one resolution pass; it is never shared across
//!   concurrent passes.
//! - A bypassing instance (administrative contexts) always hits the store.
//! - Store failures are returned and never cached.

use crate::repo::term_repo::{TermRepoResult, TermStore};
use log::trace;
use std::collections::HashMap;

/// Memoized `exists(slug, hierarchy)` predicate scoped to one pass.
pub struct TermExistenceCache<S: TermStore> {
    store: S,
    memoize: bool,
    entries: HashMap<(String, String), bool>,
    store_lookups: usize,
}

impl<S: TermStore> TermExistenceCache<S> {
    /// Creates a memoizing cache for one request/render pass.
    pub fn new(store: S) -> Self {
        Self {
            store,
            memoize: true,
            entries: HashMap::new(),
            store_lookups: 0,
        }
    }

    /// Creates a pass-through cache for administrative callers, where
    /// mid-request term edits must be visible.
    pub fn bypassing(store: S) -> Self {
        Self {
            memoize: false,
            ..Self::new(store)
        }
    }

    /// Returns whether `slug` names a term of `hierarchy_id`.
    pub fn exists(&mut self, slug: &str, hierarchy_id: &str) -> TermRepoResult<bool> {
        let key = (hierarchy_id.to_string(), slug.to_string());
        if self.memoize {
            if let Some(hit) = self.entries.get(&key) {
                trace!("event=term_exists module=cache status=hit hierarchy={hierarchy_id} slug={slug}");
                return Ok(*hit);
            }
        }

        self.store_lookups += 1;
        let exists = self.store.term_exists(slug, hierarchy_id)?;
        if self.memoize {
            self.entries.insert(key, exists);
        }
        Ok(exists)
    }

    /// Ends the pass: drops every memoized entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.store_lookups = 0;
    }

    pub fn is_memoizing(&self) -> bool {
        self.memoize
    }

    /// Number of store lookups issued since creation or last `clear`.
    pub fn store_lookups(&self) -> usize {
        self.store_lookups
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
