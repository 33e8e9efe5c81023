//! Permalink rendering for registered item types.
//!
//! # Invariants
//! - Links are `home/base/term-path/separator/item-slug` plus the site's
//!   trailing-slash convention.
//! - Unregistered item types, plain permalink structures, and draft or
//!   pending items get the caller's fallback link back unchanged.

use super::ancestors::build_term_path;
use super::canonical::resolve_canonical_term;
use super::{LinkContext, PermalinkResult};
use crate::model::item::Item;
use crate::repo::term_repo::TermStore;
use log::debug;

/// Rendered in place of the item slug when `RenderOptions::leave_name` is set.
pub const ITEM_SLUG_PLACEHOLDER: &str = "%item_slug%";

const ATTACHMENT_SEGMENT: &str = "attachment";

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Keep `ITEM_SLUG_PLACEHOLDER` instead of the item slug (slug editors).
    pub leave_name: bool,
}

/// Renders the hierarchical permalink of `item`.
///
/// `browsed_hint` is the hierarchy value of the page being viewed; when the
/// item has several terms and the hint names one of them, that term is used.
pub fn render_permalink<S: TermStore>(
    store: &S,
    ctx: &LinkContext<'_>,
    item: &Item,
    browsed_hint: Option<&str>,
    fallback: &str,
    options: RenderOptions,
) -> PermalinkResult<String> {
    if item.item_type != ctx.registration.item_type {
        return Ok(fallback.to_string());
    }
    if !ctx.site.pretty_permalinks_enabled() || !item.status.allows_hierarchical_link() {
        debug!(
            "event=permalink_render module=permalink status=skip item={} item_status={}",
            item.item_uuid,
            item.status.as_str()
        );
        return Ok(fallback.to_string());
    }

    let terms = store.associated_terms(item.item_uuid, &ctx.hierarchy.hierarchy_id)?;
    let canonical = resolve_canonical_term(&terms, browsed_hint);
    let term_path = build_term_path(store, canonical)?;

    let item_name = if options.leave_name {
        ITEM_SLUG_PLACEHOLDER
    } else {
        item.slug.as_str()
    };
    let path = [
        ctx.hierarchy.trimmed_base_slug(),
        term_path.joined().as_str(),
        ctx.registration.url_separator(),
        item_name,
    ]
    .into_iter()
    .filter(|segment| !segment.is_empty())
    .collect::<Vec<_>>()
    .join("/");

    let permalink = format!(
        "{}{}",
        ctx.site.home_url(),
        ctx.site.apply_trailing_slash(&path).trim_start_matches('/')
    );
    debug!(
        "event=permalink_render module=permalink status=ok item={} term={} terms={}",
        item.item_uuid,
        term_path.leaf(),
        terms.len()
    );
    Ok(permalink)
}

/// Link of an attachment whose parent is a hierarchical item.
pub fn attachment_link(parent_permalink: &str, attachment_slug: &str) -> String {
    format!(
        "{}/{ATTACHMENT_SEGMENT}/{}",
        parent_permalink.trim_end_matches('/'),
        attachment_slug.trim_matches('/')
    )
}
