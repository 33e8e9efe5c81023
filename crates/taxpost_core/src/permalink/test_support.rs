//! In-memory term store for unit tests.

use crate::model::item::ItemId;
use crate::model::term::{HierarchyConfig, Term, TermId};
use crate::repo::term_repo::{TermRepoResult, TermStore};
use std::cell::Cell;
use std::collections::HashMap;

#[derive(Default)]
pub(crate) struct MemoryTermStore {
    hierarchies: Vec<HierarchyConfig>,
    terms: Vec<Term>,
    associations: HashMap<ItemId, Vec<TermId>>,
    exists_calls: Cell<usize>,
}

impl MemoryTermStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_hierarchy(&mut self, config: HierarchyConfig) {
        self.hierarchies.push(config);
    }

    /// Adds a term and returns a copy for use in assertions.
    pub(crate) fn add_term(&mut self, hierarchy_id: &str, slug: &str, parent: Option<&Term>) -> Term {
        let mut term = Term::new(hierarchy_id, slug);
        if let Some(parent) = parent {
            term = term.with_parent(parent.term_uuid);
        }
        self.terms.push(term.clone());
        term
    }

    /// Rewires the parent of an existing term.
    pub(crate) fn set_parent(&mut self, term_uuid: TermId, parent: Option<TermId>) {
        if let Some(term) = self.terms.iter_mut().find(|term| term.term_uuid == term_uuid) {
            term.parent_uuid = parent;
        }
    }

    pub(crate) fn associate(&mut self, item_uuid: ItemId, terms: &[&Term]) {
        self.associations.insert(
            item_uuid,
            terms.iter().map(|term| term.term_uuid).collect(),
        );
    }

    pub(crate) fn exists_calls(&self) -> usize {
        self.exists_calls.get()
    }
}

impl TermStore for MemoryTermStore {
    fn hierarchy_config(&self, hierarchy_id: &str) -> TermRepoResult<Option<HierarchyConfig>> {
        Ok(self
            .hierarchies
            .iter()
            .find(|config| config.hierarchy_id == hierarchy_id)
            .cloned())
    }

    fn associated_terms(
        &self,
        item_uuid: ItemId,
        hierarchy_id: &str,
    ) -> TermRepoResult<Vec<Term>> {
        let ids = self.associations.get(&item_uuid).cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.terms.iter().find(|term| term.term_uuid == id))
            .filter(|term| term.hierarchy_id == hierarchy_id)
            .cloned()
            .collect())
    }

    fn get_term(&self, term_uuid: TermId) -> TermRepoResult<Option<Term>> {
        Ok(self
            .terms
            .iter()
            .find(|term| term.term_uuid == term_uuid)
            .cloned())
    }

    fn get_term_by_slug(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<Option<Term>> {
        Ok(self
            .terms
            .iter()
            .find(|term| term.slug == slug && term.hierarchy_id == hierarchy_id)
            .cloned())
    }

    fn ancestors(
        &self,
        term_uuid: TermId,
        hierarchy_id: &str,
        max_depth: usize,
    ) -> TermRepoResult<Vec<TermId>> {
        let mut ids = Vec::new();
        let mut cursor = self
            .get_term(term_uuid)?
            .filter(|term| term.hierarchy_id == hierarchy_id)
            .and_then(|term| term.parent_uuid);
        while let Some(current) = cursor {
            if ids.len() >= max_depth {
                break;
            }
            ids.push(current);
            cursor = self.get_term(current)?.and_then(|term| term.parent_uuid);
        }
        Ok(ids)
    }

    fn term_exists(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<bool> {
        self.exists_calls.set(self.exists_calls.get() + 1);
        Ok(self
            .terms
            .iter()
            .any(|term| term.slug == slug && term.hierarchy_id == hierarchy_id))
    }
}
