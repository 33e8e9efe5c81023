//! Site and registration settings.
//!
//! # Responsibility
//! - Describe the ambient site configuration permalinks depend on.
//! - Load settings from JSON and build the startup registry.
//!
//! # Invariants
//! - `home_url()` always ends with exactly one `/`.
//! - An empty `permalink_structure` disables hierarchical permalinks.

use crate::model::term::HierarchyConfig;
use crate::registry::{PermalinkRegistry, Registration, RegistryError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Settings loading/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    EmptyBaseUrl,
    Registry(RegistryError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read settings: {err}"),
            Self::Parse(err) => write!(f, "invalid settings json: {err}"),
            Self::EmptyBaseUrl => write!(f, "site.base_url must not be empty"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::EmptyBaseUrl => None,
        }
    }
}

impl From<RegistryError> for ConfigError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

/// Ambient, read-only site configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site base URL, e.g. `https://site.example`.
    pub base_url: String,
    /// Host permalink structure. Empty means "plain" links.
    #[serde(default)]
    pub permalink_structure: String,
    /// Whether single-item links end with `/`.
    #[serde(default = "default_trailing_slash")]
    pub trailing_slash: bool,
}

fn default_trailing_slash() -> bool {
    true
}

impl SiteConfig {
    /// Creates a config with pretty permalinks and trailing slashes enabled.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            permalink_structure: "/%postname%/".to_string(),
            trailing_slash: true,
        }
    }

    pub fn with_permalink_structure(mut self, structure: impl Into<String>) -> Self {
        self.permalink_structure = structure.into();
        self
    }

    pub fn with_trailing_slash(mut self, trailing_slash: bool) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    /// Base URL normalized to end with one `/`.
    pub fn home_url(&self) -> String {
        format!("{}/", self.base_url.trim().trim_end_matches('/'))
    }

    pub fn pretty_permalinks_enabled(&self) -> bool {
        !self.permalink_structure.trim().is_empty()
    }

    /// Applies the site's trailing-slash convention to a single-item path.
    pub fn apply_trailing_slash(&self, path: &str) -> String {
        let trimmed = path.trim_end_matches('/');
        if self.trailing_slash {
            format!("{trimmed}/")
        } else {
            trimmed.to_string()
        }
    }
}

/// Full settings document: site config, hierarchy URL configs to seed, and
/// item type registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermalinkSettings {
    pub site: SiteConfig,
    #[serde(default)]
    pub hierarchies: Vec<HierarchyConfig>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
}

impl PermalinkSettings {
    /// Parses settings from a JSON document.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(value).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and parses settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.base_url.trim().trim_end_matches('/').is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        Ok(())
    }

    /// Builds the startup registry from the declared registrations.
    pub fn to_registry(&self) -> Result<PermalinkRegistry, ConfigError> {
        let mut registry = PermalinkRegistry::new();
        for registration in &self.registrations {
            registry.register(registration.clone())?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PermalinkSettings, SiteConfig};

    #[test]
    fn home_url_has_single_trailing_slash() {
        assert_eq!(
            SiteConfig::new("https://site.example").home_url(),
            "https://site.example/"
        );
        assert_eq!(
            SiteConfig::new("https://site.example//").home_url(),
            "https://site.example/"
        );
    }

    #[test]
    fn trailing_slash_convention_is_applied() {
        let with_slash = SiteConfig::new("https://site.example");
        assert_eq!(with_slash.apply_trailing_slash("shop/a"), "shop/a/");
        assert_eq!(with_slash.apply_trailing_slash("shop/a/"), "shop/a/");

        let without_slash = with_slash.with_trailing_slash(false);
        assert_eq!(without_slash.apply_trailing_slash("shop/a/"), "shop/a");
    }

    #[test]
    fn parses_settings_document_with_defaults() {
        let settings = PermalinkSettings::from_json_str(
            r#"{
                "site": { "base_url": "https://site.example", "permalink_structure": "/%postname%/" },
                "registrations": [
                    { "item_type": "product", "hierarchy": "product_cat" },
                    { "item_type": "recipe", "hierarchy": "cuisine", "separator": "dish" }
                ]
            }"#,
        )
        .unwrap();

        assert!(settings.site.trailing_slash);
        assert!(settings.hierarchies.is_empty());
        assert!(settings.site.pretty_permalinks_enabled());
        let registry = settings.to_registry().unwrap();
        assert_eq!(registry.get("product").unwrap().url_separator(), "product");
        assert_eq!(registry.get("recipe").unwrap().url_separator(), "dish");
    }

    #[test]
    fn parses_hierarchy_configs() {
        let settings = PermalinkSettings::from_json_str(
            r#"{
                "site": { "base_url": "https://site.example" },
                "hierarchies": [
                    { "hierarchy_id": "product_cat", "base_slug": "shop", "query_var": "product_cat" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(settings.hierarchies.len(), 1);
        assert_eq!(settings.hierarchies[0].trimmed_base_slug(), "shop");
        assert!(!settings.site.pretty_permalinks_enabled());
    }

    #[test]
    fn rejects_empty_base_url() {
        let err = PermalinkSettings::from_json_str(r#"{ "site": { "base_url": "/" } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyBaseUrl));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = PermalinkSettings::from_json_str("{ site: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
