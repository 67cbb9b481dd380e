//! Bulk reconciler. Merges spreadsheet batches into the catalog by
//! natural key.
//!
//! Design:
//!   - Products upsert by `sku`, stores by `code`.
//!   - Price/cost rows resolve `sku` (and `store_code` for prices) at
//!     reconciliation time; unresolvable rows are skipped.
//!   - Invalid rows are skipped; the batch always continues.
//!   - Every row reports its own disposition.
//!   - Each row is its own transaction. A batch is NOT atomic: a failure
//!     part-way leaves the rows before it applied.
//!   - Any batch that changed at least one row invalidates the whole
//!     query cache.
//!   - Re-running an unchanged batch writes nothing.

use crate::{
    cache::{ListingKey, QueryCache},
    error::CatalogResult,
    import::{
        CatalogueRow, CostRow, EntityKind, FromRawRow, PriceRow, ProductRow, RawRow, RowIssue,
        Sheet, StoreRow, Workbook,
    },
    store::{CatalogStore, ProductSummary, PurgeCounts, UpsertOutcome},
};
use serde::Serialize;
use std::fmt;

pub type ListingCache = QueryCache<ListingKey, Vec<ProductSummary>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Invalid(RowIssue),
    UnresolvedReference { field: &'static str, value: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Invalid(issue) => write!(f, "{issue}"),
            SkipReason::UnresolvedReference { field, value } => write!(f, "unknown {field} '{value}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum Disposition {
    Inserted,
    Updated,
    /// Accepted, but the catalog already held exactly this.
    Unchanged,
    Skipped { reason: SkipReason },
}

impl Disposition {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Disposition::Skipped { .. })
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Disposition::Inserted | Disposition::Updated)
    }

    fn skipped(reason: SkipReason) -> Self {
        Disposition::Skipped { reason }
    }
}

impl From<UpsertOutcome> for Disposition {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted => Disposition::Inserted,
            UpsertOutcome::Updated => Disposition::Updated,
            UpsertOutcome::Unchanged => Disposition::Unchanged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    /// 1-based sheet line; the header is line 1.
    pub line: u64,
    /// Natural key of the row when it has one (`sku` or `code`).
    pub key: Option<String>,
    #[serde(flatten)]
    pub disposition: Disposition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub kind: EntityKind,
    pub outcomes: Vec<RowOutcome>,
}

impl ReconciliationResult {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            outcomes: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn accepted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.disposition.is_accepted())
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.total() - self.accepted()
    }

    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.disposition.is_change())
            .count()
    }

    pub fn skipped_rows(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes
            .iter()
            .filter(|o| !o.disposition.is_accepted())
    }
}

/// One result per processed sheet, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub sheets: Vec<ReconciliationResult>,
}

impl ImportReport {
    pub fn result(&self, kind: EntityKind) -> Option<&ReconciliationResult> {
        self.sheets.iter().find(|r| r.kind == kind)
    }

    pub fn accepted(&self) -> usize {
        self.sheets.iter().map(|r| r.accepted()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.sheets.iter().map(|r| r.skipped()).sum()
    }

    pub fn changed(&self) -> usize {
        self.sheets.iter().map(|r| r.changed()).sum()
    }
}

pub struct Reconciler<'a> {
    store: &'a CatalogStore,
    cache: &'a ListingCache,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a CatalogStore, cache: &'a ListingCache) -> Self {
        Self { store, cache }
    }

    /// Reconcile one batch of rows of a single kind.
    ///
    /// Row-level problems become `Skipped` outcomes. Only storage failures
    /// are returned as errors, and rows applied before the failure stay
    /// applied.
    pub fn reconcile(&self, rows: &[RawRow], kind: EntityKind) -> CatalogResult<ReconciliationResult> {
        let mut result = ReconciliationResult::new(kind);

        for row in rows {
            let disposition = match self.apply_row(kind, row) {
                Ok(d) => d,
                Err(e) => {
                    log::error!(
                        "reconcile: {kind} line {} failed after {} changed rows: {e}",
                        row.line,
                        result.changed()
                    );
                    if result.changed() > 0 {
                        self.cache.invalidate();
                    }
                    return Err(e);
                }
            };
            if let Disposition::Skipped { reason } = &disposition {
                log::warn!("reconcile: {kind} line {} skipped: {reason}", row.line);
            }
            result.outcomes.push(RowOutcome {
                line: row.line,
                key: natural_key(kind, row),
                disposition,
            });
        }

        if result.changed() > 0 {
            self.cache.invalidate();
        }
        log::info!(
            "reconcile: {kind} {} rows, {} changed, {} unchanged, {} skipped",
            result.total(),
            result.changed(),
            result.accepted() - result.changed(),
            result.skipped()
        );
        Ok(result)
    }

    /// Reconcile a sheet whose name identifies its kind. Unknown sheet
    /// names yield `None`.
    pub fn reconcile_sheet(&self, sheet: &Sheet) -> CatalogResult<Option<ReconciliationResult>> {
        match EntityKind::from_sheet_name(sheet.name()) {
            Some(kind) => self.reconcile(sheet.rows(), kind).map(Some),
            None => {
                log::debug!("reconcile: ignoring unknown sheet '{}'", sheet.name());
                Ok(None)
            }
        }
    }

    /// Process every known sheet present, parents first. Absent sheets are
    /// skipped silently.
    pub fn import_workbook(&self, workbook: &Workbook) -> CatalogResult<ImportReport> {
        let mut report = ImportReport::default();
        for kind in EntityKind::IMPORT_ORDER {
            let Some(sheet) = workbook.sheet(kind.sheet_name()) else {
                continue;
            };
            report.sheets.push(self.reconcile(sheet.rows(), kind)?);
        }
        log::info!(
            "import: {} sheets, {} accepted ({} changed), {} skipped",
            report.sheets.len(),
            report.accepted(),
            report.changed(),
            report.skipped()
        );
        Ok(report)
    }

    /// Delete the whole catalog. Irreversible; callers gate it separately
    /// from imports.
    pub fn purge(&self) -> CatalogResult<PurgeCounts> {
        let counts = self.store.purge()?;
        self.cache.invalidate();
        log::warn!(
            "purge: removed {} products, {} stores, {} prices, {} costs, {} photos",
            counts.products,
            counts.stores,
            counts.prices,
            counts.costs,
            counts.photos
        );
        Ok(counts)
    }

    // ── Per-row merge ──────────────────────────────────────────

    fn apply_row(&self, kind: EntityKind, row: &RawRow) -> CatalogResult<Disposition> {
        match kind {
            EntityKind::Product => self.apply_product(row),
            EntityKind::Store => self.apply_store(row),
            EntityKind::Price => self.apply_price(row),
            EntityKind::Cost => self.apply_cost(row),
            EntityKind::Catalogue => self.apply_catalogue(row),
        }
    }

    fn apply_product(&self, row: &RawRow) -> CatalogResult<Disposition> {
        let product = match ProductRow::from_raw(row) {
            Ok(p) => p,
            Err(issue) => return Ok(Disposition::skipped(SkipReason::Invalid(issue))),
        };
        Ok(self.store.upsert_product(&product)?.into())
    }

    fn apply_store(&self, row: &RawRow) -> CatalogResult<Disposition> {
        let store = match StoreRow::from_raw(row) {
            Ok(s) => s,
            Err(issue) => return Ok(Disposition::skipped(SkipReason::Invalid(issue))),
        };
        Ok(self.store.upsert_store(&store)?.into())
    }

    fn apply_price(&self, row: &RawRow) -> CatalogResult<Disposition> {
        let price = match PriceRow::from_raw(row) {
            Ok(p) => p,
            Err(issue) => return Ok(Disposition::skipped(SkipReason::Invalid(issue))),
        };
        let Some(product_id) = self.store.product_id_by_sku(&price.sku)? else {
            return Ok(Disposition::skipped(SkipReason::UnresolvedReference {
                field: "sku",
                value: price.sku,
            }));
        };
        let store_id = match &price.store_code {
            None => None,
            Some(code) => match self.store.store_id_by_code(code)? {
                Some(id) => Some(id),
                None => {
                    return Ok(Disposition::skipped(SkipReason::UnresolvedReference {
                        field: "store_code",
                        value: code.clone(),
                    }))
                }
            },
        };
        let inserted = self.store.insert_price_if_absent(
            &product_id,
            store_id.as_deref(),
            price.price,
            price.valid_from,
            price.valid_to,
        )?;
        Ok(if inserted {
            Disposition::Inserted
        } else {
            Disposition::Unchanged
        })
    }

    fn apply_cost(&self, row: &RawRow) -> CatalogResult<Disposition> {
        let cost = match CostRow::from_raw(row) {
            Ok(c) => c,
            Err(issue) => return Ok(Disposition::skipped(SkipReason::Invalid(issue))),
        };
        let Some(product_id) = self.store.product_id_by_sku(&cost.sku)? else {
            return Ok(Disposition::skipped(SkipReason::UnresolvedReference {
                field: "sku",
                value: cost.sku,
            }));
        };
        let inserted =
            self.store
                .insert_cost_if_absent(&product_id, cost.cost, cost.valid_from, cost.valid_to)?;
        Ok(if inserted {
            Disposition::Inserted
        } else {
            Disposition::Unchanged
        })
    }

    fn apply_catalogue(&self, row: &RawRow) -> CatalogResult<Disposition> {
        let entry = match CatalogueRow::from_raw(row) {
            Ok(e) => e,
            Err(issue) => return Ok(Disposition::skipped(SkipReason::Invalid(issue))),
        };
        Ok(self.store.upsert_catalogue_row(&entry)?.into())
    }
}

fn natural_key(kind: EntityKind, row: &RawRow) -> Option<String> {
    let column = match kind {
        EntityKind::Store => "code",
        _ => "sku",
    };
    row.get(column).map(str::to_string)
}
