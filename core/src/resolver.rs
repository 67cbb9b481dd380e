//! Temporal resolver. Picks the one price or cost record that applies to a
//! product on a given date.
//!
//! Selection rule:
//!   - eligible: `valid_from <= as_of` and (`valid_to` open or `>= as_of`)
//!   - price only: an explicit store scope keeps records of that store only;
//!     no scope accepts every record, store-scoped or not
//!   - winner: greatest `valid_from`; on a tie, greatest insertion sequence
//!     (the most recently imported record)
//!
//! Both history modes go through the same selection. In single-value mode
//! the product's `price`/`cost` columns are presented as a one-record
//! history that is valid forever and carries no store. Temporal mode uses
//! the same one-record history for a measure whose log is empty.

use crate::{
    config::HistoryMode,
    error::CatalogResult,
    store::{CatalogStore, TemporalRecord},
    types::Date,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Price,
    Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope<'a> {
    Any,
    Only(&'a str),
}

impl<'a> StoreScope<'a> {
    pub fn from_option(store_id: Option<&'a str>) -> Self {
        match store_id {
            Some(id) => StoreScope::Only(id),
            None => StoreScope::Any,
        }
    }

    fn accepts(&self, record: &TemporalRecord) -> bool {
        match self {
            StoreScope::Any => true,
            StoreScope::Only(id) => record.store_id.as_deref() == Some(*id),
        }
    }
}

/// Pure selection over an in-memory history.
pub fn select_active<'r>(
    records: &'r [TemporalRecord],
    as_of: Date,
    scope: StoreScope<'_>,
) -> Option<&'r TemporalRecord> {
    records
        .iter()
        .filter(|r| r.covers(as_of) && scope.accepts(r))
        .max_by(|a, b| {
            a.valid_from
                .cmp(&b.valid_from)
                .then_with(|| a.seq.cmp(&b.seq))
        })
}

/// Where a history came from. Column histories carry no store, so a
/// store scope does not apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Log,
    Column,
}

pub struct Resolver<'s> {
    store: &'s CatalogStore,
    mode: HistoryMode,
}

impl<'s> Resolver<'s> {
    pub fn new(store: &'s CatalogStore, mode: HistoryMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    /// Active price. `None` means no active price, which is not zero.
    pub fn price(
        &self,
        product_id: &str,
        as_of: Date,
        store_id: Option<&str>,
    ) -> CatalogResult<Option<TemporalRecord>> {
        self.resolve(Measure::Price, product_id, as_of, StoreScope::from_option(store_id))
    }

    /// Active cost. Costs are store-independent.
    pub fn cost(&self, product_id: &str, as_of: Date) -> CatalogResult<Option<TemporalRecord>> {
        self.resolve(Measure::Cost, product_id, as_of, StoreScope::Any)
    }

    pub fn resolve(
        &self,
        measure: Measure,
        product_id: &str,
        as_of: Date,
        scope: StoreScope<'_>,
    ) -> CatalogResult<Option<TemporalRecord>> {
        let (history, source) = self.lookup(measure, product_id)?;
        let scope = match (measure, source) {
            (Measure::Price, Source::Log) => scope,
            _ => StoreScope::Any,
        };
        let active = select_active(&history, as_of, scope).cloned();
        log::debug!(
            "resolver: {measure:?} for {product_id} on {as_of} -> {}",
            active
                .as_ref()
                .map_or_else(|| "none".to_string(), |r| format!("{:.4}", r.value))
        );
        Ok(active)
    }

    /// Every record the selection rule considers for this product.
    ///
    /// A temporal catalog whose log holds nothing for this measure falls
    /// back to the product columns, so rows loaded from a plain catalogue
    /// sheet still resolve.
    pub fn history(&self, measure: Measure, product_id: &str) -> CatalogResult<Vec<TemporalRecord>> {
        Ok(self.lookup(measure, product_id)?.0)
    }

    fn lookup(&self, measure: Measure, product_id: &str) -> CatalogResult<(Vec<TemporalRecord>, Source)> {
        if self.mode == HistoryMode::Temporal {
            let log = match measure {
                Measure::Price => self.store.price_history(product_id)?,
                Measure::Cost => self.store.cost_history(product_id)?,
            };
            if !log.is_empty() {
                return Ok((log, Source::Log));
            }
        }
        Ok((self.column_history(measure, product_id)?, Source::Column))
    }

    /// The product's `price`/`cost` column as a one-record history.
    fn column_history(&self, measure: Measure, product_id: &str) -> CatalogResult<Vec<TemporalRecord>> {
        let Some(product) = self.store.product(product_id)? else {
            return Ok(Vec::new());
        };
        let value = match measure {
            Measure::Price => product.price,
            Measure::Cost => product.cost,
        };
        Ok(value
            .map(|value| TemporalRecord {
                id: product.id.clone(),
                seq: 0,
                product_id: product.id.clone(),
                store_id: None,
                value,
                valid_from: NaiveDate::MIN,
                valid_to: None,
            })
            .into_iter()
            .collect())
    }
}
