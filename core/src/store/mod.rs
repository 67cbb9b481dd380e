//! SQLite persistence layer.
//!
//! RULE: Only the store module talks to the database.
//! The resolver, reconciler and catalog call store methods and never
//! execute SQL directly.
//!
//! Every write method is one atomic statement or one short transaction.
//! Nothing here spans a whole import batch.

use crate::{
    error::CatalogResult,
    types::{Date, EntityId, ProductId, StoreId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

mod photos;
mod products;
mod records;
mod stores;

pub struct CatalogStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl CatalogStore {
    pub fn open(path: &str) -> CatalogResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CatalogResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply the bundled schema. Every statement is idempotent.
    pub fn migrate(&self) -> CatalogResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_catalog.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_indexes.sql"))?;
        Ok(())
    }

    // ── Purge ──────────────────────────────────────────────────

    /// Delete every catalog row, children before parents, in one
    /// transaction. Irreversible.
    pub fn purge(&self) -> CatalogResult<PurgeCounts> {
        let tx = self.conn.unchecked_transaction()?;
        let photos = tx.execute("DELETE FROM photos", [])?;
        let prices = tx.execute("DELETE FROM prices", [])?;
        let costs = tx.execute("DELETE FROM costs", [])?;
        let products = tx.execute("DELETE FROM products", [])?;
        let stores = tx.execute("DELETE FROM stores", [])?;
        tx.commit()?;
        Ok(PurgeCounts {
            photos,
            prices,
            costs,
            products,
            stores,
        })
    }

    // ── Counts ─────────────────────────────────────────────────

    fn count(&self, table: &'static str) -> CatalogResult<i64> {
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| {
                row.get(0)
            })?;
        Ok(n)
    }

    pub fn product_count(&self) -> CatalogResult<i64> {
        self.count("products")
    }

    pub fn store_count(&self) -> CatalogResult<i64> {
        self.count("stores")
    }

    pub fn price_count(&self) -> CatalogResult<i64> {
        self.count("prices")
    }

    pub fn cost_count(&self) -> CatalogResult<i64> {
        self.count("costs")
    }

    pub fn photo_count(&self) -> CatalogResult<i64> {
        self.count("photos")
    }
}

/// Result of a natural-key upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeCounts {
    pub photos: usize,
    pub prices: usize,
    pub costs: usize,
    pub products: usize,
    pub stores: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub status: String,
    pub photo_url: Option<String>,
    /// Single-value model only.
    pub price: Option<f64>,
    /// Single-value model only.
    pub cost: Option<f64>,
}

/// The columns a listing shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: StoreId,
    pub code: String,
    pub name: String,
    pub sector_id: Option<String>,
}

/// One price or cost history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalRecord {
    pub id: EntityId,
    /// Insertion sequence (SQLite rowid). Breaks ties on `valid_from`.
    pub seq: i64,
    pub product_id: ProductId,
    /// Always `None` for costs.
    pub store_id: Option<StoreId>,
    pub value: f64,
    pub valid_from: Date,
    pub valid_to: Option<Date>,
}

impl TemporalRecord {
    pub fn covers(&self, as_of: Date) -> bool {
        self.valid_from <= as_of && self.valid_to.map_or(true, |to| to >= as_of)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: EntityId,
    pub product_id: ProductId,
    pub key: String,
    pub taken_by: Option<String>,
    pub taken_at: DateTime<Utc>,
}

/// Round to a fixed number of decimals, matching numeric(10,2)/(10,4).
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub(crate) fn new_id() -> EntityId {
    uuid::Uuid::new_v4().to_string()
}
