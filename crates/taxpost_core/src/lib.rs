//! Hierarchical term-based permalinks for content items.
//! Links take the form `home/base/ancestor.../term/separator/item/`, and the
//! encoded term is recovered from inbound URLs.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod permalink;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::{ConfigError, PermalinkSettings, SiteConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_env, logging_status};
pub use model::item::{Item, ItemId, ItemStatus};
pub use model::term::{HierarchyConfig, Term, TermId, UNCATEGORIZED_SLUG};
pub use permalink::{
    LinkContext, PermalinkError, PermalinkResult, RenderOptions, RouteRule, RouteTable,
    TermExistenceCache,
};
pub use registry::{PermalinkRegistry, Registration, RegistryError};
pub use repo::item_repo::{
    AdjacentDirection, AdjacentItemQuery, ItemRepoError, ItemRepository, SqliteItemRepository,
};
pub use repo::term_repo::{SqliteTermStore, TermRepoError, TermStore};
pub use service::permalink_service::{
    PermalinkService, PermalinkServiceError, PermalinkServiceResult, ResolvedItem,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
