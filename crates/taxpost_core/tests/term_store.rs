use rusqlite::Connection;
use taxpost_core::db::open_db_in_memory;
use taxpost_core::{
    HierarchyConfig, Item, SqliteItemRepository, SqliteTermStore, TermRepoError, TermStore,
};

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    store
        .upsert_hierarchy(&HierarchyConfig::new("product_cat", "shop", "product_cat"))
        .unwrap();
    store
        .upsert_hierarchy(&HierarchyConfig::new("brand", "brands", "brand"))
        .unwrap();
    conn
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteTermStore::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        TermRepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn upsert_hierarchy_replaces_url_config() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    store
        .upsert_hierarchy(&HierarchyConfig::new("product_cat", "store", "cat"))
        .unwrap();

    let config = store.hierarchy_config("product_cat").unwrap().unwrap();
    assert_eq!(config.base_slug, "store");
    assert_eq!(config.query_var, "cat");
    assert!(store.hierarchy_config("missing").unwrap().is_none());
}

#[test]
fn create_term_validates_hierarchy_and_parent() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    let acme = store.create_term("brand", "acme", None).unwrap();

    let err = store.create_term("unknown", "x", None).unwrap_err();
    assert!(matches!(err, TermRepoError::HierarchyNotFound(_)));

    let err = store
        .create_term("product_cat", "tools", Some(acme.term_uuid))
        .unwrap_err();
    assert!(matches!(err, TermRepoError::TermNotFound(id) if id == acme.term_uuid));
}

#[test]
fn slugs_are_unique_per_hierarchy_only() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    store.create_term("product_cat", "tools", None).unwrap();
    store.create_term("brand", "tools", None).unwrap();

    let err = store.create_term("product_cat", "tools", None).unwrap_err();
    assert!(matches!(err, TermRepoError::Db(_)));

    assert!(store.term_exists("tools", "product_cat").unwrap());
    assert!(store.term_exists("tools", "brand").unwrap());
    assert!(!store.term_exists("garden", "product_cat").unwrap());
}

#[test]
fn ancestors_are_nearest_parent_first() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    let tools = store.create_term("product_cat", "tools", None).unwrap();
    let power = store
        .create_term("product_cat", "power", Some(tools.term_uuid))
        .unwrap();
    let drills = store
        .create_term("product_cat", "drills", Some(power.term_uuid))
        .unwrap();

    let ids = store
        .ancestors(drills.term_uuid, "product_cat", 64)
        .unwrap();
    assert_eq!(ids, vec![power.term_uuid, tools.term_uuid]);
    assert!(store
        .ancestors(tools.term_uuid, "product_cat", 64)
        .unwrap()
        .is_empty());
}

#[test]
fn ancestors_stay_bounded_on_cyclic_data() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    let a = store.create_term("product_cat", "a", None).unwrap();
    let b = store
        .create_term("product_cat", "b", Some(a.term_uuid))
        .unwrap();
    conn.execute(
        "UPDATE terms SET parent_uuid = ?1 WHERE term_uuid = ?2;",
        [b.term_uuid.to_string(), a.term_uuid.to_string()],
    )
    .unwrap();

    let ids = store.ancestors(b.term_uuid, "product_cat", 5).unwrap();
    assert_eq!(ids.len(), 5);
    assert_eq!(ids[0], a.term_uuid);
    assert_eq!(ids[1], b.term_uuid);
}

#[test]
fn ancestors_follow_parents_across_hierarchies() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    let acme = store.create_term("brand", "acme", None).unwrap();
    let tools = store.create_term("product_cat", "tools", None).unwrap();
    let power = store
        .create_term("product_cat", "power", Some(tools.term_uuid))
        .unwrap();
    conn.execute(
        "UPDATE terms SET parent_uuid = ?1 WHERE term_uuid = ?2;",
        [acme.term_uuid.to_string(), tools.term_uuid.to_string()],
    )
    .unwrap();

    let ids = store.ancestors(power.term_uuid, "product_cat", 10).unwrap();
    assert_eq!(ids, vec![tools.term_uuid, acme.term_uuid]);
    assert!(store.ancestors(power.term_uuid, "brand", 10).unwrap().is_empty());
}

#[test]
fn associations_keep_assigned_order_per_hierarchy() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let item = Item::new("product", "widget-a");
    items.create_item(&item).unwrap();

    let tools = store.create_term("product_cat", "tools", None).unwrap();
    let garden = store.create_term("product_cat", "garden", None).unwrap();
    let acme = store.create_term("brand", "acme", None).unwrap();

    store
        .set_item_terms(
            item.item_uuid,
            "product_cat",
            &[tools.term_uuid, garden.term_uuid],
        )
        .unwrap();
    store
        .set_item_terms(item.item_uuid, "brand", &[acme.term_uuid])
        .unwrap();

    let slugs: Vec<String> = store
        .associated_terms(item.item_uuid, "product_cat")
        .unwrap()
        .into_iter()
        .map(|term| term.slug)
        .collect();
    assert_eq!(slugs, vec!["tools", "garden"]);

    store
        .set_item_terms(item.item_uuid, "product_cat", &[garden.term_uuid])
        .unwrap();
    let remaining = store
        .associated_terms(item.item_uuid, "product_cat")
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].slug, "garden");
    assert_eq!(store.associated_terms(item.item_uuid, "brand").unwrap().len(), 1);
}

#[test]
fn set_item_terms_rejects_term_of_other_hierarchy() {
    let conn = setup();
    let store = SqliteTermStore::try_new(&conn).unwrap();
    let items = SqliteItemRepository::try_new(&conn).unwrap();
    let item = Item::new("product", "widget-a");
    items.create_item(&item).unwrap();
    let tools = store.create_term("product_cat", "tools", None).unwrap();
    let acme = store.create_term("brand", "acme", None).unwrap();

    store
        .set_item_terms(item.item_uuid, "product_cat", &[tools.term_uuid])
        .unwrap();
    let err = store
        .set_item_terms(item.item_uuid, "product_cat", &[acme.term_uuid])
        .unwrap_err();
    assert!(matches!(err, TermRepoError::TermNotFound(id) if id == acme.term_uuid));

    // The failed replacement is rolled back.
    let kept = store
        .associated_terms(item.item_uuid, "product_cat")
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].term_uuid, tools.term_uuid);
}
