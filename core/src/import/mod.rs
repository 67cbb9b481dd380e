//! Spreadsheet intake: workbook loading and row validation.
//!
//! Loosely-typed sheet rows are turned into typed rows here, before the
//! reconciler sees them. A missing field, a bad number and a bad date all
//! become the same `RowIssue`.

mod rows;
mod sheet;

pub use rows::{CatalogueRow, CostRow, FromRawRow, PriceRow, ProductRow, RowIssue, StoreRow};
pub use sheet::{RawRow, Sheet, Workbook};

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a sheet holds, and therefore how its rows are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Product,
    Store,
    Price,
    Cost,
    /// Simplified single-sheet layout: product plus current price/cost.
    Catalogue,
}

impl EntityKind {
    /// Processing order for a workbook import. Parents before children.
    pub const IMPORT_ORDER: [EntityKind; 5] = [
        EntityKind::Product,
        EntityKind::Store,
        EntityKind::Price,
        EntityKind::Cost,
        EntityKind::Catalogue,
    ];

    pub fn sheet_name(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::Store => "stores",
            EntityKind::Price => "prices",
            EntityKind::Cost => "costs",
            EntityKind::Catalogue => "catalogue",
        }
    }

    pub fn from_sheet_name(name: &str) -> Option<Self> {
        Self::IMPORT_ORDER
            .into_iter()
            .find(|k| k.sheet_name().eq_ignore_ascii_case(name.trim()))
    }

    /// Column layout of the sheet.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Product => &["sku", "name", "brand", "category", "status", "photo_url"],
            EntityKind::Store => &["code", "name", "sector_id"],
            EntityKind::Price => &["sku", "store_code", "price", "valid_from", "valid_to"],
            EntityKind::Cost => &["sku", "cost", "valid_from", "valid_to"],
            EntityKind::Catalogue => &["sku", "name", "category", "cost", "price", "photo_url"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}
