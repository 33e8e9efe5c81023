//! Term store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Define the collaborator operations permalink generation/recovery read.
//! - Keep SQL details and association ordering inside repository boundary.
//! - Provide authoring helpers used to seed hierarchies, terms and links.
//!
//! # Invariants
//! - `associated_terms` order is stable: `term_order ASC, slug ASC`.
//! - `ancestors` is nearest-parent-first and never returns more than
//!   `max_depth` ids, even when persisted parent links form a cycle.
//! - `ancestors` reports parent links as stored: a link into another
//!   hierarchy is followed, a link to a missing row is returned as the last
//!   id. Callers validate the chain.
//! - Term slugs are unique per hierarchy.

use crate::db::migrations::latest_version;
use crate::db::{table_exists, table_has_column, DbError};
use crate::model::item::ItemId;
use crate::model::term::{HierarchyConfig, Term, TermId};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TERM_COLUMNS: &str = "t.term_uuid AS term_uuid,
    t.hierarchy_id AS hierarchy_id,
    t.slug AS slug,
    t.parent_uuid AS parent_uuid";

/// Result type used by term store operations.
pub type TermRepoResult<T> = Result<T, TermRepoError>;

/// Errors from term store operations.
#[derive(Debug)]
pub enum TermRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target term does not exist in the expected hierarchy.
    TermNotFound(TermId),
    /// Target hierarchy is not configured.
    HierarchyNotFound(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for TermRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::TermNotFound(id) => write!(f, "term not found: {id}"),
            Self::HierarchyNotFound(id) => write!(f, "hierarchy not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "term store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "term store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "term store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid term data: {message}"),
        }
    }
}

impl Error for TermRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for TermRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TermRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read-side collaborator contract consumed by the permalink engine.
pub trait TermStore {
    /// Loads URL configuration of one hierarchy.
    fn hierarchy_config(&self, hierarchy_id: &str) -> TermRepoResult<Option<HierarchyConfig>>;
    /// Lists terms associated with one item, in stable association order.
    fn associated_terms(&self, item_uuid: ItemId, hierarchy_id: &str)
        -> TermRepoResult<Vec<Term>>;
    /// Loads one term by id.
    fn get_term(&self, term_uuid: TermId) -> TermRepoResult<Option<Term>>;
    /// Loads one term by slug inside one hierarchy.
    fn get_term_by_slug(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<Option<Term>>;
    /// Lists stored parent ids, nearest parent first, at most `max_depth`
    /// entries. Only the starting term is filtered by `hierarchy_id`.
    fn ancestors(
        &self,
        term_uuid: TermId,
        hierarchy_id: &str,
        max_depth: usize,
    ) -> TermRepoResult<Vec<TermId>>;
    /// Uncached existence predicate for one slug in one hierarchy.
    fn term_exists(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<bool>;
}

impl<T: TermStore + ?Sized> TermStore for &T {
    fn hierarchy_config(&self, hierarchy_id: &str) -> TermRepoResult<Option<HierarchyConfig>> {
        (**self).hierarchy_config(hierarchy_id)
    }

    fn associated_terms(
        &self,
        item_uuid: ItemId,
        hierarchy_id: &str,
    ) -> TermRepoResult<Vec<Term>> {
        (**self).associated_terms(item_uuid, hierarchy_id)
    }

    fn get_term(&self, term_uuid: TermId) -> TermRepoResult<Option<Term>> {
        (**self).get_term(term_uuid)
    }

    fn get_term_by_slug(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<Option<Term>> {
        (**self).get_term_by_slug(slug, hierarchy_id)
    }

    fn ancestors(
        &self,
        term_uuid: TermId,
        hierarchy_id: &str,
        max_depth: usize,
    ) -> TermRepoResult<Vec<TermId>> {
        (**self).ancestors(term_uuid, hierarchy_id, max_depth)
    }

    fn term_exists(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<bool> {
        (**self).term_exists(slug, hierarchy_id)
    }
}

/// SQLite-backed term store.
pub struct SqliteTermStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTermStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TermRepoResult<Self> {
        ensure_term_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Inserts or replaces one hierarchy configuration.
    pub fn upsert_hierarchy(&self, config: &HierarchyConfig) -> TermRepoResult<()> {
        self.conn.execute(
            "INSERT INTO hierarchies (hierarchy_id, base_slug, query_var)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (hierarchy_id) DO UPDATE SET
                base_slug = excluded.base_slug,
                query_var = excluded.query_var;",
            params![config.hierarchy_id, config.base_slug, config.query_var],
        )?;
        Ok(())
    }

    /// Creates one term under optional parent.
    ///
    /// # Errors
    /// - `HierarchyNotFound` when the hierarchy is not configured.
    /// - `TermNotFound` when `parent_uuid` is not a term of the same hierarchy.
    pub fn create_term(
        &self,
        hierarchy_id: &str,
        slug: &str,
        parent_uuid: Option<TermId>,
    ) -> TermRepoResult<Term> {
        if self.hierarchy_config(hierarchy_id)?.is_none() {
            return Err(TermRepoError::HierarchyNotFound(hierarchy_id.to_string()));
        }
        if let Some(parent_uuid) = parent_uuid {
            match self.get_term(parent_uuid)? {
                Some(parent) if parent.hierarchy_id == hierarchy_id => {}
                _ => return Err(TermRepoError::TermNotFound(parent_uuid)),
            }
        }

        let term = Term {
            term_uuid: Uuid::new_v4(),
            hierarchy_id: hierarchy_id.to_string(),
            slug: slug.trim().to_string(),
            parent_uuid,
        };
        self.conn.execute(
            "INSERT INTO terms (term_uuid, hierarchy_id, slug, parent_uuid)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                term.term_uuid.to_string(),
                term.hierarchy_id,
                term.slug,
                term.parent_uuid.map(|value| value.to_string()),
            ],
        )?;
        Ok(term)
    }

    /// Replaces the item's associations within one hierarchy.
    ///
    /// Association order follows the order of `term_uuids`.
    pub fn set_item_terms(
        &self,
        item_uuid: ItemId,
        hierarchy_id: &str,
        term_uuids: &[TermId],
    ) -> TermRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let item_text = item_uuid.to_string();

        tx.execute(
            "DELETE FROM item_terms
             WHERE item_uuid = ?1
               AND term_uuid IN (SELECT term_uuid FROM terms WHERE hierarchy_id = ?2);",
            params![item_text, hierarchy_id],
        )?;

        for (index, term_uuid) in term_uuids.iter().enumerate() {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO item_terms (item_uuid, term_uuid, term_order)
                 SELECT ?1, term_uuid, ?3
                 FROM terms
                 WHERE term_uuid = ?2
                   AND hierarchy_id = ?4;",
                params![
                    item_text,
                    term_uuid.to_string(),
                    index as i64,
                    hierarchy_id
                ],
            )?;
            if inserted == 0 && !term_in_hierarchy(&tx, *term_uuid, hierarchy_id)? {
                return Err(TermRepoError::TermNotFound(*term_uuid));
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl TermStore for SqliteTermStore<'_> {
    fn hierarchy_config(&self, hierarchy_id: &str) -> TermRepoResult<Option<HierarchyConfig>> {
        let config = self
            .conn
            .query_row(
                "SELECT hierarchy_id, base_slug, query_var
                 FROM hierarchies
                 WHERE hierarchy_id = ?1;",
                [hierarchy_id],
                |row| {
                    Ok(HierarchyConfig {
                        hierarchy_id: row.get(0)?,
                        base_slug: row.get(1)?,
                        query_var: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(config)
    }

    fn associated_terms(
        &self,
        item_uuid: ItemId,
        hierarchy_id: &str,
    ) -> TermRepoResult<Vec<Term>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TERM_COLUMNS}
             FROM item_terms it
             INNER JOIN terms t ON t.term_uuid = it.term_uuid
             WHERE it.item_uuid = ?1
               AND t.hierarchy_id = ?2
             ORDER BY it.term_order ASC, t.slug ASC;"
        ))?;
        let mut rows = stmt.query(params![item_uuid.to_string(), hierarchy_id])?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next()? {
            terms.push(parse_term_row(row)?);
        }
        Ok(terms)
    }

    fn get_term(&self, term_uuid: TermId) -> TermRepoResult<Option<Term>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TERM_COLUMNS}
             FROM terms t
             WHERE t.term_uuid = ?1;"
        ))?;
        let mut rows = stmt.query([term_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_term_row(row)?));
        }
        Ok(None)
    }

    fn get_term_by_slug(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<Option<Term>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TERM_COLUMNS}
             FROM terms t
             WHERE t.slug = ?1
               AND t.hierarchy_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![slug, hierarchy_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_term_row(row)?));
        }
        Ok(None)
    }

    fn ancestors(
        &self,
        term_uuid: TermId,
        hierarchy_id: &str,
        max_depth: usize,
    ) -> TermRepoResult<Vec<TermId>> {
        let mut stmt = self.conn.prepare(
            "WITH RECURSIVE chain(term_uuid, parent_uuid, depth) AS (
                SELECT term_uuid, parent_uuid, 0
                FROM terms
                WHERE term_uuid = ?1
                  AND hierarchy_id = ?2
                UNION ALL
                SELECT t.term_uuid, t.parent_uuid, chain.depth + 1
                FROM terms t
                INNER JOIN chain ON t.term_uuid = chain.parent_uuid
                WHERE chain.depth + 1 < ?3
            )
            SELECT parent_uuid
            FROM chain
            WHERE parent_uuid IS NOT NULL
            ORDER BY depth ASC
            LIMIT ?3;",
        )?;
        let mut rows = stmt.query(params![
            term_uuid.to_string(),
            hierarchy_id,
            max_depth as i64
        ])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "terms.term_uuid")?);
        }
        Ok(ids)
    }

    fn term_exists(&self, slug: &str, hierarchy_id: &str) -> TermRepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM terms
                WHERE slug = ?1
                  AND hierarchy_id = ?2
            );",
            params![slug, hierarchy_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn term_in_hierarchy(
    conn: &Connection,
    term_uuid: TermId,
    hierarchy_id: &str,
) -> TermRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM terms
            WHERE term_uuid = ?1
              AND hierarchy_id = ?2
        );",
        params![term_uuid.to_string(), hierarchy_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_term_row(row: &Row<'_>) -> TermRepoResult<Term> {
    let term_uuid_text: String = row.get("term_uuid")?;
    let parent_uuid = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "terms.parent_uuid"))
        .transpose()?;

    Ok(Term {
        term_uuid: parse_uuid(&term_uuid_text, "terms.term_uuid")?,
        hierarchy_id: row.get("hierarchy_id")?,
        slug: row.get("slug")?,
        parent_uuid,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> TermRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| TermRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_term_connection_ready(conn: &Connection) -> TermRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(TermRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 3] = [
        ("hierarchies", &["hierarchy_id", "base_slug", "query_var"]),
        ("terms", &["term_uuid", "hierarchy_id", "slug", "parent_uuid"]),
        ("item_terms", &["item_uuid", "term_uuid", "term_order"]),
    ];
    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(TermRepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(TermRepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}
