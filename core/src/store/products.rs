use super::{new_id, round_to, CatalogStore, ProductRecord, ProductSummary, UpsertOutcome};
use crate::{
    error::CatalogResult,
    import::{CatalogueRow, ProductRow},
    types::ProductId,
};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const PRODUCT_COLUMNS: &str = "id, sku, name, brand, category, status, photo_url, price, cost";

impl CatalogStore {
    fn map_product_row(row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
        Ok(ProductRecord {
            id: row.get(0)?,
            sku: row.get(1)?,
            name: row.get(2)?,
            brand: row.get(3)?,
            category: row.get(4)?,
            status: row
                .get::<_, Option<String>>(5)?
                .unwrap_or_else(|| "active".to_string()),
            photo_url: row.get(6)?,
            price: row.get(7)?,
            cost: row.get(8)?,
        })
    }

    pub fn product_by_sku(&self, sku: &str) -> CatalogResult<Option<ProductRecord>> {
        let product = self
            .conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"),
                params![sku],
                Self::map_product_row,
            )
            .optional()?;
        Ok(product)
    }

    pub fn product(&self, product_id: &str) -> CatalogResult<Option<ProductRecord>> {
        let product = self
            .conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
                params![product_id],
                Self::map_product_row,
            )
            .optional()?;
        Ok(product)
    }

    pub fn product_id_by_sku(&self, sku: &str) -> CatalogResult<Option<ProductId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM products WHERE sku = ?1 LIMIT 1",
                params![sku],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Every product, ordered by sku. Used for state comparisons.
    pub fn all_products(&self) -> CatalogResult<Vec<ProductRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sku ASC"))?;
        let rows = stmt
            .query_map([], Self::map_product_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Upsert by sku. Scalars are overwritten; `photo_url` only when the
    /// incoming value is present. One transaction per call.
    pub fn upsert_product(&self, row: &ProductRow) -> CatalogResult<UpsertOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let existing = tx
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"),
                params![row.sku],
                Self::map_product_row,
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO products (id, sku, name, brand, category, status, photo_url)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        new_id(),
                        row.sku,
                        row.name,
                        row.brand,
                        row.category,
                        row.status,
                        row.photo_url,
                    ],
                )?;
                UpsertOutcome::Inserted
            }
            Some(current) => {
                let photo_url = row.photo_url.clone().or_else(|| current.photo_url.clone());
                let unchanged = current.name == row.name
                    && current.brand == row.brand
                    && current.category == row.category
                    && current.status == row.status
                    && current.photo_url == photo_url;
                if unchanged {
                    UpsertOutcome::Unchanged
                } else {
                    tx.execute(
                        "UPDATE products
                         SET name = ?2, brand = ?3, category = ?4, status = ?5, photo_url = ?6
                         WHERE id = ?1",
                        params![
                            current.id,
                            row.name,
                            row.brand,
                            row.category,
                            row.status,
                            photo_url,
                        ],
                    )?;
                    UpsertOutcome::Updated
                }
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Upsert a simplified-layout row: the product plus its single current
    /// price and cost, overwritten in place. Brand and status are not part
    /// of that layout and are left alone on update.
    pub fn upsert_catalogue_row(&self, row: &CatalogueRow) -> CatalogResult<UpsertOutcome> {
        let price = row.price.map(|p| round_to(p, 2));
        let cost = row.cost.map(|c| round_to(c, 4));

        let tx = self.conn.unchecked_transaction()?;
        let existing = tx
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"),
                params![row.sku],
                Self::map_product_row,
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO products (id, sku, name, category, status, photo_url, price, cost)
                     VALUES (?1, ?2, ?3, ?4, 'active', ?5, ?6, ?7)",
                    params![new_id(), row.sku, row.name, row.category, row.photo_url, price, cost],
                )?;
                UpsertOutcome::Inserted
            }
            Some(current) => {
                let photo_url = row.photo_url.clone().or_else(|| current.photo_url.clone());
                let unchanged = current.name == row.name
                    && current.category == row.category
                    && current.photo_url == photo_url
                    && current.price == price
                    && current.cost == cost;
                if unchanged {
                    UpsertOutcome::Unchanged
                } else {
                    tx.execute(
                        "UPDATE products
                         SET name = ?2, category = ?3, photo_url = ?4, price = ?5, cost = ?6
                         WHERE id = ?1",
                        params![current.id, row.name, row.category, photo_url, price, cost],
                    )?;
                    UpsertOutcome::Updated
                }
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Cascades to prices, costs and photos.
    pub fn delete_product(&self, sku: &str) -> CatalogResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM products WHERE sku = ?1", params![sku])?;
        Ok(n > 0)
    }

    // ── Listing ────────────────────────────────────────────────

    /// Case-insensitive substring search on name or sku, optionally
    /// restricted to a category set, ordered by name.
    pub fn search_products(
        &self,
        search: &str,
        categories: &[String],
        limit: usize,
    ) -> CatalogResult<Vec<ProductSummary>> {
        let mut sql = String::from(
            "SELECT id, sku, name, brand, category, photo_url
             FROM products
             WHERE (?1 = ''
                OR lower(name) LIKE '%' || lower(?1) || '%' ESCAPE '\\'
                OR lower(sku)  LIKE '%' || lower(?1) || '%' ESCAPE '\\')",
        );
        let mut values: Vec<String> = vec![escape_like(search.trim())];

        if !categories.is_empty() {
            let placeholders = (0..categories.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND category IN ({placeholders})"));
            values.extend(categories.iter().cloned());
        }
        sql.push_str(&format!(" ORDER BY name ASC, sku ASC LIMIT {limit}"));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(ProductSummary {
                    id: row.get(0)?,
                    sku: row.get(1)?,
                    name: row.get(2)?,
                    brand: row.get(3)?,
                    category: row.get(4)?,
                    photo_url: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn distinct_categories(&self) -> CatalogResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category FROM products
             WHERE category IS NOT NULL
             ORDER BY 1",
        )?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
