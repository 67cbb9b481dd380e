use super::{new_id, CatalogStore, PhotoRecord};
use crate::error::CatalogResult;
use chrono::{DateTime, Utc};
use rusqlite::params;

impl CatalogStore {
    pub fn insert_photo(
        &self,
        product_id: &str,
        key: &str,
        taken_by: Option<&str>,
        taken_at: DateTime<Utc>,
    ) -> CatalogResult<PhotoRecord> {
        let photo = PhotoRecord {
            id: new_id(),
            product_id: product_id.to_string(),
            key: key.to_string(),
            taken_by: taken_by.map(str::to_string),
            taken_at,
        };
        self.conn.execute(
            "INSERT INTO photos (id, product_id, key, taken_by, taken_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![photo.id, photo.product_id, photo.key, photo.taken_by, photo.taken_at],
        )?;
        Ok(photo)
    }

    /// Most recent first.
    pub fn recent_photos(&self, product_id: &str, limit: usize) -> CatalogResult<Vec<PhotoRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, product_id, key, taken_by, taken_at
             FROM photos WHERE product_id = ?1
             ORDER BY taken_at DESC, rowid DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![product_id, limit as i64], |row| {
                Ok(PhotoRecord {
                    id: row.get(0)?,
                    product_id: row.get(1)?,
                    key: row.get(2)?,
                    taken_by: row.get(3)?,
                    taken_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
