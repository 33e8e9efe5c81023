//! Item type registrations for hierarchical permalinks.
//!
//! # Responsibility
//! - Hold the (item type, hierarchy, separator) pairs built at startup.
//! - Validate ids and separators before they reach URL patterns.
//!
//! # Invariants
//! - One registration per item type.
//! - Separator defaults to the item type id when unset or blank.
//! - The registry is read-only once request handling starts; callers share
//!   it by reference.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static URL_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid url slug regex"));

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidItemType(String),
    InvalidHierarchy(String),
    InvalidSeparator(String),
    DuplicateItemType(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidItemType(value) => write!(f, "item type id is invalid: `{value}`"),
            Self::InvalidHierarchy(value) => write!(f, "hierarchy id is invalid: `{value}`"),
            Self::InvalidSeparator(value) => write!(f, "url separator is invalid: `{value}`"),
            Self::DuplicateItemType(value) => {
                write!(f, "item type already registered: `{value}`")
            }
        }
    }
}

impl Error for RegistryError {}

/// One item type enabled for hierarchical permalinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Item type id, e.g. `product`.
    pub item_type: String,
    /// Hierarchy id the item type is classified by, e.g. `product_cat`.
    pub hierarchy: String,
    /// Path segment between the term path and the item slug.
    #[serde(default)]
    pub separator: Option<String>,
}

impl Registration {
    pub fn new(item_type: impl Into<String>, hierarchy: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            hierarchy: hierarchy.into(),
            separator: None,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Effective separator segment.
    pub fn url_separator(&self) -> &str {
        match self.separator.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => self.item_type.as_str(),
        }
    }
}

/// Startup-built registry of hierarchical item types.
#[derive(Debug, Clone, Default)]
pub struct PermalinkRegistry {
    registrations: BTreeMap<String, Registration>,
}

impl PermalinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one item type.
    ///
    /// # Errors
    /// - Item type, hierarchy or separator is not a URL-safe slug.
    /// - The item type is already registered.
    pub fn register(&mut self, registration: Registration) -> Result<(), RegistryError> {
        let item_type = registration.item_type.trim().to_string();
        if !is_url_slug(&item_type) {
            return Err(RegistryError::InvalidItemType(item_type));
        }
        let hierarchy = registration.hierarchy.trim().to_string();
        if !is_url_slug(&hierarchy) {
            return Err(RegistryError::InvalidHierarchy(hierarchy));
        }
        let separator = registration
            .separator
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if let Some(value) = separator.as_deref() {
            if !is_url_slug(value) {
                return Err(RegistryError::InvalidSeparator(value.to_string()));
            }
        }
        if self.registrations.contains_key(item_type.as_str()) {
            return Err(RegistryError::DuplicateItemType(item_type));
        }

        self.registrations.insert(
            item_type.clone(),
            Registration {
                item_type,
                hierarchy,
                separator,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Returns the registration of one item type.
    pub fn get(&self, item_type: &str) -> Option<&Registration> {
        self.registrations.get(item_type.trim())
    }

    /// Whether an item type is registered.
    pub fn contains(&self, item_type: &str) -> bool {
        self.get(item_type).is_some()
    }

    /// Iterates registrations sorted by item type id.
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.values()
    }

    /// Returns registrations classified by one hierarchy.
    pub fn for_hierarchy<'a>(
        &'a self,
        hierarchy: &'a str,
    ) -> impl Iterator<Item = &'a Registration> + 'a {
        self.iter()
            .filter(move |registration| registration.hierarchy == hierarchy)
    }
}

fn is_url_slug(value: &str) -> bool {
    URL_SLUG_RE.is_match(value)
}
