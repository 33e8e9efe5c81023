//! Permalink use-case service.
//!
//! # Responsibility
//! - Resolve the registration and hierarchy config behind each call.
//! - Render item and attachment links, recover terms, resolve inbound URLs.
//! - Build host route rules and answer adjacent-item navigation.
//!
//! # Invariants
//! - Every `recover_term*` call runs in its own resolution pass.
//! - Administrative recovery never reuses memoized existence answers.
//! - Items of unregistered types always get the caller's fallback link.
//! - Item routes used by `resolve_url` are compiled once per service; the
//!   registry and hierarchy configs are read-only while it serves.

use crate::config::SiteConfig;
use crate::model::item::{Item, ItemId};
use crate::model::term::{HierarchyConfig, TermId};
use crate::permalink::canonical::normalize_browsed_hint;
use crate::permalink::routes::ITEM_TYPE_QUERY_VAR;
use crate::permalink::{
    attachment_link, build_routes, recover_term, render_permalink, split_hierarchy_query,
    LinkContext, PermalinkError, RenderOptions, RouteError, RouteRule, RouteTable,
    TermExistenceCache,
};
use crate::registry::{PermalinkRegistry, Registration};
use crate::repo::item_repo::{
    AdjacentDirection, AdjacentItemQuery, ItemRepoError, ItemRepository,
};
use crate::repo::term_repo::{TermRepoError, TermStore};
use log::{debug, info, warn};
use once_cell::unsync::OnceCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for permalink use-cases.
#[derive(Debug)]
pub enum PermalinkServiceError {
    /// Item type has a registration but its hierarchy is not configured.
    HierarchyNotConfigured(String),
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Engine or store failure.
    Permalink(PermalinkError),
    /// Generated route rule does not compile.
    Route(RouteError),
}

impl Display for PermalinkServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HierarchyNotConfigured(id) => write!(f, "hierarchy is not configured: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Permalink(err) => write!(f, "{err}"),
            Self::Route(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PermalinkServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Permalink(err) => Some(err),
            Self::Route(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PermalinkError> for PermalinkServiceError {
    fn from(value: PermalinkError) -> Self {
        Self::Permalink(value)
    }
}

impl From<TermRepoError> for PermalinkServiceError {
    fn from(value: TermRepoError) -> Self {
        Self::Permalink(PermalinkError::Store(value))
    }
}

impl From<ItemRepoError> for PermalinkServiceError {
    fn from(value: ItemRepoError) -> Self {
        Self::Permalink(PermalinkError::Items(value))
    }
}

impl From<RouteError> for PermalinkServiceError {
    fn from(value: RouteError) -> Self {
        Self::Route(value)
    }
}

pub type PermalinkServiceResult<T> = Result<T, PermalinkServiceError>;

/// Item addressed by an inbound URL together with the term it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub item: Item,
    /// Recovered term slug; `None` when no path segment names a term.
    pub term_slug: Option<String>,
}

/// Permalink service facade over term and item stores.
pub struct PermalinkService<'a, T: TermStore, I: ItemRepository> {
    registry: &'a PermalinkRegistry,
    site: &'a SiteConfig,
    terms: T,
    items: I,
    item_routes: OnceCell<RouteTable>,
}

impl<'a, T: TermStore, I: ItemRepository> PermalinkService<'a, T, I> {
    /// Creates a service reading the startup registry and site config.
    pub fn new(
        registry: &'a PermalinkRegistry,
        site: &'a SiteConfig,
        terms: T,
        items: I,
    ) -> Self {
        Self {
            registry,
            site,
            terms,
            items,
            item_routes: OnceCell::new(),
        }
    }

    pub fn registry(&self) -> &PermalinkRegistry {
        self.registry
    }

    pub fn site(&self) -> &SiteConfig {
        self.site
    }

    /// Loads one item or fails with `ItemNotFound`.
    pub fn get_item(&self, item_uuid: ItemId) -> PermalinkServiceResult<Item> {
        self.items
            .get_item(item_uuid)?
            .ok_or(PermalinkServiceError::ItemNotFound(item_uuid))
    }

    /// Renders the permalink of `item`, or returns `fallback` when the item
    /// type is not registered.
    pub fn item_permalink(
        &self,
        item: &Item,
        browsed_hint: Option<&str>,
        fallback: &str,
        options: RenderOptions,
    ) -> PermalinkServiceResult<String> {
        let Some((registration, hierarchy)) = self.registration_for(&item.item_type)? else {
            return Ok(fallback.to_string());
        };
        let ctx = LinkContext::new(self.site, registration, &hierarchy);
        let link = render_permalink(&self.terms, &ctx, item, browsed_hint, fallback, options)
            .map_err(|err| {
                if err.is_data_integrity() {
                    warn!(
                        "event=item_permalink module=service status=error item={} error={}",
                        item.item_uuid, err
                    );
                }
                err
            })?;
        Ok(link)
    }

    /// Recovers the term slug encoded in `current_url` for one request pass.
    pub fn recover_term(
        &self,
        item: &Item,
        current_url: &str,
    ) -> PermalinkServiceResult<Option<String>> {
        let mut cache = TermExistenceCache::new(&self.terms);
        self.recover_with(&mut cache, item, current_url)
    }

    /// Recovers the term slug without memoization, for administrative views
    /// where terms may be edited mid-request.
    pub fn recover_term_admin(
        &self,
        item: &Item,
        current_url: &str,
    ) -> PermalinkServiceResult<Option<String>> {
        let mut cache = TermExistenceCache::bypassing(&self.terms);
        self.recover_with(&mut cache, item, current_url)
    }

    fn recover_with(
        &self,
        cache: &mut TermExistenceCache<&T>,
        item: &Item,
        current_url: &str,
    ) -> PermalinkServiceResult<Option<String>> {
        let Some((registration, hierarchy)) = self.registration_for(&item.item_type)? else {
            return Ok(None);
        };
        let ctx = LinkContext::new(self.site, registration, &hierarchy);
        let term = recover_term(cache, &ctx, item, current_url)?;
        debug!(
            "event=recover_term module=service status=ok item={} memoized={} lookups={}",
            item.item_uuid,
            cache.is_memoizing(),
            cache.store_lookups()
        );
        Ok(term)
    }

    /// Resolves an inbound URL to the item it addresses and the encoded term.
    ///
    /// Returns `Ok(None)` when the URL is not under the site, matches no
    /// hierarchical route, or names no stored item.
    pub fn resolve_url(&self, url: &str) -> PermalinkServiceResult<Option<ResolvedItem>> {
        let home = self.site.home_url();
        let url_path = url.split(['?', '#']).next().unwrap_or(url);
        let Some(path) = url_path.strip_prefix(home.as_str()) else {
            return Ok(None);
        };

        let table = self.item_routes()?;
        let Some(matched) = table.match_path(path) else {
            debug!("event=resolve_url module=service status=miss reason=no_route");
            return Ok(None);
        };
        let Some(item_type) = matched.query_vars.get(ITEM_TYPE_QUERY_VAR) else {
            return Ok(None);
        };
        let Some(slug) = matched
            .query_vars
            .get(item_type.as_str())
            .filter(|slug| !slug.is_empty())
        else {
            return Ok(None);
        };
        let Some(item) = self.items.get_item_by_slug(item_type, slug)? else {
            debug!(
                "event=resolve_url module=service status=miss reason=no_item item_type={}",
                item_type
            );
            return Ok(None);
        };

        let term_slug = self.recover_term(&item, url)?;
        Ok(Some(ResolvedItem { item, term_slug }))
    }

    /// Link of an attachment item.
    ///
    /// Attachments whose parent is a linkable item of a registered type live
    /// under the parent's permalink; every other attachment keeps `fallback`.
    pub fn attachment_link(
        &self,
        attachment: &Item,
        fallback: &str,
    ) -> PermalinkServiceResult<String> {
        let Some(parent_uuid) = attachment.parent_uuid else {
            return Ok(fallback.to_string());
        };
        let Some(parent) = self.items.get_item(parent_uuid)? else {
            return Ok(fallback.to_string());
        };
        if !self.registry.contains(&parent.item_type)
            || !self.site.pretty_permalinks_enabled()
            || !parent.status.allows_hierarchical_link()
        {
            return Ok(fallback.to_string());
        }

        let parent_link =
            self.item_permalink(&parent, None, fallback, RenderOptions::default())?;
        let link = attachment_link(&parent_link, &attachment.slug);
        debug!(
            "event=attachment_link module=service status=ok item={} parent={}",
            attachment.item_uuid, parent.item_uuid
        );
        Ok(link)
    }

    /// Finds the nearest published item of the same type in `direction`.
    ///
    /// `browsed_hint` restricts navigation to the browsed term; excluded term
    /// slugs never exclude terms the current item itself belongs to.
    pub fn adjacent_item(
        &self,
        item: &Item,
        direction: AdjacentDirection,
        browsed_hint: Option<&str>,
        excluded_slugs: &[&str],
    ) -> PermalinkServiceResult<Option<Item>> {
        let Some((_, hierarchy)) = self.registration_for(&item.item_type)? else {
            return Ok(None);
        };
        let hierarchy_id = hierarchy.hierarchy_id.as_str();

        let in_term = match browsed_hint.map(normalize_browsed_hint) {
            Some(slug) if !slug.is_empty() => self
                .terms
                .get_term_by_slug(slug, hierarchy_id)?
                .map(|term| term.term_uuid),
            _ => None,
        };

        let own_terms: Vec<TermId> = self
            .terms
            .associated_terms(item.item_uuid, hierarchy_id)?
            .into_iter()
            .map(|term| term.term_uuid)
            .collect();
        let mut excluded_terms = Vec::new();
        for slug in excluded_slugs {
            if let Some(term) = self.terms.get_term_by_slug(slug.trim(), hierarchy_id)? {
                if !own_terms.contains(&term.term_uuid)
                    && !excluded_terms.contains(&term.term_uuid)
                {
                    excluded_terms.push(term.term_uuid);
                }
            }
        }

        let query = AdjacentItemQuery {
            item_type: item.item_type.clone(),
            published_at: item.published_at,
            direction,
            hierarchy_id: hierarchy_id.to_string(),
            in_term,
            excluded_terms,
        };
        let adjacent = self.items.adjacent_item(&query)?;
        debug!(
            "event=adjacent_item module=service status={} item={} direction={:?}",
            if adjacent.is_some() { "ok" } else { "miss" },
            item.item_uuid,
            direction
        );
        Ok(adjacent)
    }

    /// Builds route rules for every registered item type, ahead of `existing`.
    ///
    /// Registrations whose hierarchy is not configured are skipped.
    pub fn routes(&self, existing: Vec<RouteRule>) -> PermalinkServiceResult<Vec<RouteRule>> {
        let sources = self.route_sources()?;
        let rules = build_routes(
            sources
                .iter()
                .map(|(registration, hierarchy)| (*registration, hierarchy)),
            existing,
        );
        info!(
            "event=routes_build module=service status=ok generated={}",
            sources.len()
        );
        Ok(rules)
    }

    /// Compiles `routes(existing)` into a matchable table.
    pub fn route_table(&self, existing: Vec<RouteRule>) -> PermalinkServiceResult<RouteTable> {
        Ok(RouteTable::compile(self.routes(existing)?)?)
    }

    /// Item routes alone, compiled on first use and reused afterwards.
    pub fn item_routes(&self) -> PermalinkServiceResult<&RouteTable> {
        self.item_routes.get_or_try_init(|| self.route_table(Vec::new()))
    }

    /// Collapses `/`-joined hierarchy query values for every registration.
    pub fn split_query(
        &self,
        query_vars: &mut BTreeMap<String, String>,
    ) -> PermalinkServiceResult<()> {
        let sources = self.route_sources()?;
        split_hierarchy_query(
            query_vars,
            sources
                .iter()
                .map(|(registration, hierarchy)| (*registration, hierarchy)),
        );
        Ok(())
    }

    fn route_sources(&self) -> PermalinkServiceResult<Vec<(&'a Registration, HierarchyConfig)>> {
        let mut sources = Vec::with_capacity(self.registry.len());
        for registration in self.registry.iter() {
            match self.terms.hierarchy_config(&registration.hierarchy)? {
                Some(hierarchy) => sources.push((registration, hierarchy)),
                None => warn!(
                    "event=routes_build module=service status=skip item_type={} hierarchy={}",
                    registration.item_type, registration.hierarchy
                ),
            }
        }
        Ok(sources)
    }

    fn registration_for(
        &self,
        item_type: &str,
    ) -> PermalinkServiceResult<Option<(&'a Registration, HierarchyConfig)>> {
        let Some(registration) = self.registry.get(item_type) else {
            return Ok(None);
        };
        let hierarchy = self
            .terms
            .hierarchy_config(&registration.hierarchy)?
            .ok_or_else(|| {
                PermalinkServiceError::HierarchyNotConfigured(registration.hierarchy.clone())
            })?;
        Ok(Some((registration, hierarchy)))
    }
}
