//! Read-only access to reference catalogs.
//!
//! # Responsibility
//! - List locations, departments, teams, competencies and company assets.
//!
//! # Invariants
//! - This core never writes catalog tables.
//! - Listing order is `name ASC, id ASC` so snapshots are stable.

use crate::model::catalog::{CatalogItem, CatalogKind};
use crate::repo::jd_repo::RepoResult;
use rusqlite::Connection;

/// Catalog provider contract ("list all").
pub trait CatalogRepository {
    fn list_all(&self, kind: CatalogKind) -> RepoResult<Vec<CatalogItem>>;
}

/// SQLite-backed catalog provider.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn list_all(&self, kind: CatalogKind) -> RepoResult<Vec<CatalogItem>> {
        // Table names come from a closed enum, never from input.
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} ORDER BY name ASC, id ASC;",
            kind.table()
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(CatalogItem {
                id: row.get("id")?,
                name: row.get("name")?,
            });
        }
        Ok(items)
    }
}
