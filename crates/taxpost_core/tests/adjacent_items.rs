use rusqlite::Connection;
use taxpost_core::db::open_db_in_memory;
use taxpost_core::{
    AdjacentDirection, HierarchyConfig, Item, ItemRepository, ItemStatus, PermalinkRegistry,
    PermalinkService, Registration, SiteConfig, SqliteItemRepository, SqliteTermStore, Term,
};

struct Catalog {
    conn: Connection,
    registry: PermalinkRegistry,
    site: SiteConfig,
}

struct Seeded {
    first: Item,
    second: Item,
    third: Item,
}

impl Catalog {
    fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        SqliteTermStore::try_new(&conn)
            .unwrap()
            .upsert_hierarchy(&HierarchyConfig::new("product_cat", "shop", "product_cat"))
            .unwrap();
        let mut registry = PermalinkRegistry::new();
        registry
            .register(Registration::new("product", "product_cat"))
            .unwrap();
        Self {
            conn,
            registry,
            site: SiteConfig::new("https://site.example"),
        }
    }

    fn term(&self, slug: &str) -> Term {
        SqliteTermStore::try_new(&self.conn)
            .unwrap()
            .create_term("product_cat", slug, None)
            .unwrap()
    }

    fn item(&self, item: Item, terms: &[&Term]) -> Item {
        SqliteItemRepository::try_new(&self.conn)
            .unwrap()
            .create_item(&item)
            .unwrap();
        let ids: Vec<_> = terms.iter().map(|term| term.term_uuid).collect();
        SqliteTermStore::try_new(&self.conn)
            .unwrap()
            .set_item_terms(item.item_uuid, "product_cat", &ids)
            .unwrap();
        item
    }

    /// tools: first(100), third(300), draft(250); garden: second(200);
    /// one foreign-type item at 150.
    fn seed(&self) -> Seeded {
        let tools = self.term("tools");
        let garden = self.term("garden");
        let first = self.item(
            Item::new("product", "hammer").with_published_at(100),
            &[&tools],
        );
        let second = self.item(
            Item::new("product", "hose").with_published_at(200),
            &[&garden],
        );
        let third = self.item(
            Item::new("product", "saw").with_published_at(300),
            &[&tools],
        );
        self.item(
            Item::new("product", "drill")
                .with_published_at(250)
                .with_status(ItemStatus::Draft),
            &[&tools],
        );
        self.item(Item::new("recipe", "ramen").with_published_at(150), &[]);
        Seeded {
            first,
            second,
            third,
        }
    }

    fn adjacent(
        &self,
        item: &Item,
        direction: AdjacentDirection,
        hint: Option<&str>,
        excluded: &[&str],
    ) -> Option<String> {
        PermalinkService::new(
            &self.registry,
            &self.site,
            SqliteTermStore::try_new(&self.conn).unwrap(),
            SqliteItemRepository::try_new(&self.conn).unwrap(),
        )
        .adjacent_item(item, direction, hint, excluded)
        .unwrap()
        .map(|item| item.slug)
    }
}

#[test]
fn next_and_previous_follow_publication_order() {
    let catalog = Catalog::new();
    let seeded = catalog.seed();

    assert_eq!(
        catalog.adjacent(&seeded.first, AdjacentDirection::Next, None, &[]),
        Some("hose".to_string())
    );
    assert_eq!(
        catalog.adjacent(&seeded.third, AdjacentDirection::Previous, None, &[]),
        Some("hose".to_string())
    );
    assert_eq!(
        catalog.adjacent(&seeded.third, AdjacentDirection::Next, None, &[]),
        None
    );
    assert_eq!(
        catalog.adjacent(&seeded.first, AdjacentDirection::Previous, None, &[]),
        None
    );
}

#[test]
fn items_sharing_publication_time_are_skipped() {
    let catalog = Catalog::new();
    let seeded = catalog.seed();
    catalog.item(Item::new("product", "rake").with_published_at(200), &[]);

    assert_eq!(
        catalog.adjacent(&seeded.second, AdjacentDirection::Next, None, &[]),
        Some("saw".to_string())
    );
    assert_eq!(
        catalog.adjacent(&seeded.second, AdjacentDirection::Previous, None, &[]),
        Some("hammer".to_string())
    );
}

#[test]
fn browsed_term_restricts_navigation() {
    let catalog = Catalog::new();
    let seeded = catalog.seed();

    assert_eq!(
        catalog.adjacent(&seeded.first, AdjacentDirection::Next, Some("tools"), &[]),
        Some("saw".to_string())
    );
    assert_eq!(
        catalog.adjacent(
            &seeded.third,
            AdjacentDirection::Previous,
            Some("shop/tools"),
            &[]
        ),
        Some("hammer".to_string())
    );
}

#[test]
fn excluded_terms_skip_items_but_never_own_terms() {
    let catalog = Catalog::new();
    let seeded = catalog.seed();

    assert_eq!(
        catalog.adjacent(&seeded.first, AdjacentDirection::Next, None, &["garden"]),
        Some("saw".to_string())
    );
    assert_eq!(
        catalog.adjacent(&seeded.first, AdjacentDirection::Next, None, &["tools"]),
        Some("hose".to_string())
    );
    assert_eq!(
        catalog.adjacent(&seeded.second, AdjacentDirection::Next, None, &["unknown"]),
        Some("saw".to_string())
    );
}

#[test]
fn unregistered_item_type_has_no_neighbours() {
    let catalog = Catalog::new();
    catalog.seed();
    let ramen = SqliteItemRepository::try_new(&catalog.conn)
        .unwrap()
        .get_item_by_slug("recipe", "ramen")
        .unwrap()
        .unwrap();

    assert_eq!(
        catalog.adjacent(&ramen, AdjacentDirection::Previous, None, &[]),
        None
    );
}
