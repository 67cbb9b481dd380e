use super::{new_id, round_to, CatalogStore, TemporalRecord};
use crate::{error::CatalogResult, types::Date};
use rusqlite::params;

impl CatalogStore {
    /// Insert a price record unless an identical one (product, store,
    /// value, window) already exists. Returns whether a row was written.
    pub fn insert_price_if_absent(
        &self,
        product_id: &str,
        store_id: Option<&str>,
        price: f64,
        valid_from: Date,
        valid_to: Option<Date>,
    ) -> CatalogResult<bool> {
        let n = self.conn.execute(
            "INSERT INTO prices (id, product_id, store_id, price, valid_from, valid_to)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6
             WHERE NOT EXISTS (
                 SELECT 1 FROM prices
                 WHERE product_id = ?2 AND store_id IS ?3 AND price = ?4
                   AND valid_from = ?5 AND valid_to IS ?6
             )",
            params![
                new_id(),
                product_id,
                store_id,
                round_to(price, 2),
                valid_from,
                valid_to,
            ],
        )?;
        Ok(n > 0)
    }

    /// Cost counterpart of `insert_price_if_absent`. Costs have no store.
    pub fn insert_cost_if_absent(
        &self,
        product_id: &str,
        cost: f64,
        valid_from: Date,
        valid_to: Option<Date>,
    ) -> CatalogResult<bool> {
        let n = self.conn.execute(
            "INSERT INTO costs (id, product_id, cost, valid_from, valid_to)
             SELECT ?1, ?2, ?3, ?4, ?5
             WHERE NOT EXISTS (
                 SELECT 1 FROM costs
                 WHERE product_id = ?2 AND cost = ?3
                   AND valid_from = ?4 AND valid_to IS ?5
             )",
            params![new_id(), product_id, round_to(cost, 4), valid_from, valid_to],
        )?;
        Ok(n > 0)
    }

    /// Full price history of a product in insertion order.
    pub fn price_history(&self, product_id: &str) -> CatalogResult<Vec<TemporalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, product_id, store_id, price, valid_from, valid_to
             FROM prices WHERE product_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![product_id], |row| {
                Ok(TemporalRecord {
                    seq: row.get(0)?,
                    id: row.get(1)?,
                    product_id: row.get(2)?,
                    store_id: row.get(3)?,
                    value: row.get(4)?,
                    valid_from: row.get(5)?,
                    valid_to: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Full cost history of a product in insertion order.
    pub fn cost_history(&self, product_id: &str) -> CatalogResult<Vec<TemporalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, product_id, cost, valid_from, valid_to
             FROM costs WHERE product_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![product_id], |row| {
                Ok(TemporalRecord {
                    seq: row.get(0)?,
                    id: row.get(1)?,
                    product_id: row.get(2)?,
                    store_id: None,
                    value: row.get(3)?,
                    valid_from: row.get(4)?,
                    valid_to: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
