//! Canonical term selection for multi-term items.
//!
//! # Invariants
//! - Zero associations (or a chosen term with an empty slug) map to
//!   `Uncategorized`.
//! - A single association always wins, whatever the hint.
//! - With several associations the browsed hint wins when it matches one of
//!   them; otherwise association order decides (first term).

use crate::model::term::Term;

/// Term chosen to represent an item in its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalTerm<'a> {
    Term(&'a Term),
    Uncategorized,
}

/// Reduces a browsed hierarchy value (`parent/child`) to its last segment.
pub fn normalize_browsed_hint(hint: &str) -> &str {
    let trimmed = hint.trim().trim_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Picks exactly one term to represent the item in generated links.
pub fn resolve_canonical_term<'a>(
    terms: &'a [Term],
    browsed_hint: Option<&str>,
) -> CanonicalTerm<'a> {
    let chosen = match terms {
        [] => None,
        [only] => Some(only),
        [first, ..] => {
            let hint = browsed_hint.map(normalize_browsed_hint).unwrap_or_default();
            let hinted = if hint.is_empty() {
                None
            } else {
                terms.iter().find(|term| term.slug == hint)
            };
            Some(hinted.unwrap_or(first))
        }
    };

    match chosen {
        Some(term) if !term.slug.trim().is_empty() => CanonicalTerm::Term(term),
        _ => CanonicalTerm::Uncategorized,
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_browsed_hint, resolve_canonical_term, CanonicalTerm};
    use crate::model::term::Term;

    fn terms(slugs: &[&str]) -> Vec<Term> {
        slugs
            .iter()
            .map(|slug| Term::new("product_cat", *slug))
            .collect()
    }

    #[test]
    fn empty_associations_are_uncategorized() {
        assert_eq!(
            resolve_canonical_term(&[], Some("tools")),
            CanonicalTerm::Uncategorized
        );
    }

    #[test]
    fn single_association_ignores_hint() {
        let terms = terms(&["tools"]);
        for hint in [None, Some(""), Some("garden"), Some("tools")] {
            assert_eq!(
                resolve_canonical_term(&terms, hint),
                CanonicalTerm::Term(&terms[0])
            );
        }
    }

    #[test]
    fn matching_hint_selects_browsed_term() {
        let terms = terms(&["tools", "garden", "sale"]);
        assert_eq!(
            resolve_canonical_term(&terms, Some("garden")),
            CanonicalTerm::Term(&terms[1])
        );
    }

    #[test]
    fn hint_path_uses_last_segment() {
        let terms = terms(&["tools", "garden"]);
        assert_eq!(
            resolve_canonical_term(&terms, Some("outdoor/garden")),
            CanonicalTerm::Term(&terms[1])
        );
    }

    #[test]
    fn unmatched_or_empty_hint_falls_back_to_first_association() {
        let terms = terms(&["tools", "garden"]);
        assert_eq!(
            resolve_canonical_term(&terms, Some("kitchen")),
            CanonicalTerm::Term(&terms[0])
        );
        assert_eq!(
            resolve_canonical_term(&terms, Some("")),
            CanonicalTerm::Term(&terms[0])
        );
        assert_eq!(
            resolve_canonical_term(&terms, None),
            CanonicalTerm::Term(&terms[0])
        );
    }

    #[test]
    fn blank_slug_is_uncategorized() {
        let terms = terms(&[" "]);
        assert_eq!(
            resolve_canonical_term(&terms, None),
            CanonicalTerm::Uncategorized
        );
    }

    #[test]
    fn normalize_hint_trims_slashes() {
        assert_eq!(normalize_browsed_hint("a/b/c/"), "c");
        assert_eq!(normalize_browsed_hint("tools"), "tools");
        assert_eq!(normalize_browsed_hint(""), "");
    }
}
