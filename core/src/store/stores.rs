use super::{new_id, CatalogStore, StoreRecord, UpsertOutcome};
use crate::{error::CatalogResult, import::StoreRow, types::StoreId};
use rusqlite::{params, OptionalExtension};

impl CatalogStore {
    pub fn store_by_code(&self, code: &str) -> CatalogResult<Option<StoreRecord>> {
        let store = self
            .conn
            .query_row(
                "SELECT id, code, name, sector_id FROM stores WHERE code = ?1",
                params![code],
                |row| {
                    Ok(StoreRecord {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                        sector_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(store)
    }

    pub fn store_id_by_code(&self, code: &str) -> CatalogResult<Option<StoreId>> {
        Ok(self.store_by_code(code)?.map(|s| s.id))
    }

    /// Upsert by code. `name` and `sector_id` are overwritten.
    pub fn upsert_store(&self, row: &StoreRow) -> CatalogResult<UpsertOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let existing: Option<(String, String, Option<String>)> = tx
            .query_row(
                "SELECT id, name, sector_id FROM stores WHERE code = ?1",
                params![row.code],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO stores (id, code, name, sector_id) VALUES (?1, ?2, ?3, ?4)",
                    params![new_id(), row.code, row.name, row.sector_id],
                )?;
                UpsertOutcome::Inserted
            }
            Some((_, name, sector_id)) if name == row.name && sector_id == row.sector_id => {
                UpsertOutcome::Unchanged
            }
            Some((id, _, _)) => {
                tx.execute(
                    "UPDATE stores SET name = ?2, sector_id = ?3 WHERE id = ?1",
                    params![id, row.name, row.sector_id],
                )?;
                UpsertOutcome::Updated
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Prices that referenced the store become store-agnostic.
    pub fn delete_store(&self, code: &str) -> CatalogResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM stores WHERE code = ?1", params![code])?;
        Ok(n > 0)
    }
}
