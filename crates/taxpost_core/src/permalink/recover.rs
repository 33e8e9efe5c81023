//! Term recovery from inbound item URLs.
//!
//! # Invariants
//! - The URL is authoritative: associations of the item are not consulted.
//! - Candidate slugs are checked leaf-first (reverse path order); the first
//!   slug that exists in the hierarchy wins. Existing links depend on this
//!   order, including when an ancestor slug collides with an unrelated term.
//! - Malformed or foreign URLs yield `None`, never an error.

use super::cache::TermExistenceCache;
use super::{LinkContext, PermalinkResult};
use crate::model::item::Item;
use crate::repo::term_repo::TermStore;
use log::debug;

/// Recovers the term slug encoded in `current_url` for `item`.
///
/// Returns `Ok(None)` when the URL is not an item link of this hierarchy or
/// no path segment names an existing term.
pub fn recover_term<S: TermStore>(
    cache: &mut TermExistenceCache<S>,
    ctx: &LinkContext<'_>,
    item: &Item,
    current_url: &str,
) -> PermalinkResult<Option<String>> {
    if item.item_type != ctx.registration.item_type {
        return Ok(None);
    }

    let url = strip_query_and_fragment(current_url);
    let base_prefix = ctx.base_prefix();
    let Some(remaining) = url.strip_prefix(base_prefix.as_str()) else {
        debug!(
            "event=term_recover module=permalink status=skip reason=foreign_prefix item={}",
            item.item_uuid
        );
        return Ok(None);
    };

    let remaining = if remaining.ends_with('/') {
        remaining.to_string()
    } else {
        format!("{remaining}/")
    };
    let marker = format!("/{}/{}/", ctx.registration.url_separator(), item.slug);
    let Some(marker_at) = remaining.find(marker.as_str()) else {
        debug!(
            "event=term_recover module=permalink status=skip reason=no_separator item={}",
            item.item_uuid
        );
        return Ok(None);
    };

    let hierarchy_id = ctx.hierarchy.hierarchy_id.as_str();
    for slug in remaining[..marker_at]
        .split('/')
        .filter(|segment| !segment.is_empty())
        .rev()
    {
        if cache.exists(slug, hierarchy_id)? {
            debug!(
                "event=term_recover module=permalink status=ok item={} term={}",
                item.item_uuid, slug
            );
            return Ok(Some(slug.to_string()));
        }
    }

    debug!(
        "event=term_recover module=permalink status=miss item={}",
        item.item_uuid
    );
    Ok(None)
}

fn strip_query_and_fragment(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}
