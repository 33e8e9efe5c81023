//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load items addressed by permalinks.
//! - Answer next/previous navigation queries with parameterized SQL only.
//!
//! # Invariants
//! - Adjacent lookups only return `published` items of the same type.
//! - Adjacent candidates have a `published_at` strictly after (next) or
//!   before (previous) the current item's, so items sharing its timestamp
//!   are skipped. Ties among candidates are broken by `item_uuid`.

use crate::db::migrations::latest_version;
use crate::db::{table_exists, table_has_column, DbError};
use crate::model::item::{Item, ItemId, ItemStatus};
use crate::model::term::TermId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT DISTINCT
    i.item_uuid AS item_uuid,
    i.item_type AS item_type,
    i.slug AS slug,
    i.status AS status,
    i.parent_uuid AS parent_uuid,
    i.published_at AS published_at
FROM items i";

pub type ItemRepoResult<T> = Result<T, ItemRepoError>;

/// Errors from item repository operations.
#[derive(Debug)]
pub enum ItemRepoError {
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for ItemRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "item repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "item repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for ItemRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ItemRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ItemRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Navigation direction relative to the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacentDirection {
    Next,
    Previous,
}

/// Query for the nearest published sibling of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacentItemQuery {
    /// Item type to stay within.
    pub item_type: String,
    /// Publication timestamp of the current item.
    pub published_at: i64,
    pub direction: AdjacentDirection,
    /// Hierarchy the term filters apply to.
    pub hierarchy_id: String,
    /// Restrict results to items associated with this term.
    pub in_term: Option<TermId>,
    /// Skip association rows pointing at these terms.
    pub excluded_terms: Vec<TermId>,
}

/// Repository interface for item reads.
pub trait ItemRepository {
    /// Loads one item by id.
    fn get_item(&self, item_uuid: ItemId) -> ItemRepoResult<Option<Item>>;
    /// Loads one item by type and slug.
    fn get_item_by_slug(&self, item_type: &str, slug: &str) -> ItemRepoResult<Option<Item>>;
    /// Finds the nearest published item in `query.direction`.
    fn adjacent_item(&self, query: &AdjacentItemQuery) -> ItemRepoResult<Option<Item>>;
}

impl<R: ItemRepository + ?Sized> ItemRepository for &R {
    fn get_item(&self, item_uuid: ItemId) -> ItemRepoResult<Option<Item>> {
        (**self).get_item(item_uuid)
    }

    fn get_item_by_slug(&self, item_type: &str, slug: &str) -> ItemRepoResult<Option<Item>> {
        (**self).get_item_by_slug(item_type, slug)
    }

    fn adjacent_item(&self, query: &AdjacentItemQuery) -> ItemRepoResult<Option<Item>> {
        (**self).adjacent_item(query)
    }
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ItemRepoResult<Self> {
        ensure_item_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Persists one item and returns its id.
    pub fn create_item(&self, item: &Item) -> ItemRepoResult<ItemId> {
        self.conn.execute(
            "INSERT INTO items (
                item_uuid,
                item_type,
                slug,
                status,
                parent_uuid,
                published_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                item.item_uuid.to_string(),
                item.item_type,
                item.slug,
                item.status.as_str(),
                item.parent_uuid.map(|value| value.to_string()),
                item.published_at,
            ],
        )?;
        Ok(item.item_uuid)
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn get_item(&self, item_uuid: ItemId) -> ItemRepoResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE i.item_uuid = ?1;"))?;
        let mut rows = stmt.query([item_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn get_item_by_slug(&self, item_type: &str, slug: &str) -> ItemRepoResult<Option<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE i.item_type = ?1 AND i.slug = ?2
             ORDER BY i.published_at ASC, i.item_uuid ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![item_type, slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn adjacent_item(&self, query: &AdjacentItemQuery) -> ItemRepoResult<Option<Item>> {
        let mut sql = String::from(ITEM_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();

        let filters_terms = query.in_term.is_some() || !query.excluded_terms.is_empty();
        if filters_terms {
            sql.push_str(
                " INNER JOIN item_terms it ON it.item_uuid = i.item_uuid
                  INNER JOIN terms t ON t.term_uuid = it.term_uuid AND t.hierarchy_id = ?",
            );
            bind_values.push(Value::Text(query.hierarchy_id.clone()));
        }

        let (op, order) = match query.direction {
            AdjacentDirection::Next => (">", "ASC"),
            AdjacentDirection::Previous => ("<", "DESC"),
        };
        sql.push_str(&format!(
            " WHERE i.published_at {op} ? AND i.item_type = ? AND i.status = ?"
        ));
        bind_values.push(Value::Integer(query.published_at));
        bind_values.push(Value::Text(query.item_type.clone()));
        bind_values.push(Value::Text(ItemStatus::Published.as_str().to_string()));

        if let Some(term_uuid) = query.in_term {
            sql.push_str(" AND t.term_uuid = ?");
            bind_values.push(Value::Text(term_uuid.to_string()));
        }

        if !query.excluded_terms.is_empty() {
            let placeholders = vec!["?"; query.excluded_terms.len()].join(", ");
            sql.push_str(&format!(" AND t.term_uuid NOT IN ({placeholders})"));
            for term_uuid in &query.excluded_terms {
                bind_values.push(Value::Text(term_uuid.to_string()));
            }
        }

        sql.push_str(&format!(
            " ORDER BY i.published_at {order}, i.item_uuid {order} LIMIT 1;"
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }
}

fn parse_item_row(row: &Row<'_>) -> ItemRepoResult<Item> {
    let item_uuid_text: String = row.get("item_uuid")?;
    let parent_uuid = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "items.parent_uuid"))
        .transpose()?;
    let status: String = row.get("status")?;

    Ok(Item {
        item_uuid: parse_uuid(&item_uuid_text, "items.item_uuid")?,
        item_type: row.get("item_type")?,
        slug: row.get("slug")?,
        status: ItemStatus::parse(&status),
        parent_uuid,
        published_at: row.get("published_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> ItemRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ItemRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_item_connection_ready(conn: &Connection) -> ItemRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ItemRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "items")? {
        return Err(ItemRepoError::MissingRequiredTable("items"));
    }
    for column in [
        "item_uuid",
        "item_type",
        "slug",
        "status",
        "parent_uuid",
        "published_at",
    ] {
        if !table_has_column(conn, "items", column)? {
            return Err(ItemRepoError::MissingRequiredColumn {
                table: "items",
                column,
            });
        }
    }

    Ok(())
}
