//! The catalog facade. Wires store, cache, resolver and reconciler.
//!
//! FLOW:
//!   1. Reconciler writes and invalidates the listing cache.
//!   2. A listing query is served from the cache or from the store.
//!   3. Each listed product gets its active price and cost from the resolver.
//!   4. The margin calculator derives display metrics.
//!
//! RULES:
//!   - Mutations (`reconcile`, `import_workbook`, `purge`) are not gated
//!     here; callers check `access::ensure_admin` first.
//!   - Every call runs to completion on the caller's thread.

use crate::{
    cache::{ListingKey, QueryCache},
    clock::{Clock, ManualClock, SystemClock},
    config::{CatalogConfig, HistoryMode},
    error::CatalogResult,
    import::{EntityKind, RawRow, Workbook},
    metrics::{metrics_with, Metrics},
    photo::{self, BlobStore, GalleryItem},
    reconciler::{ImportReport, ListingCache, ReconciliationResult, Reconciler},
    resolver::Resolver,
    store::{CatalogStore, PhotoRecord, ProductSummary, PurgeCounts, TemporalRecord},
    types::Date,
};
use serde::Serialize;
use std::sync::Arc;

/// A listed product with its resolved values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    pub product: ProductSummary,
    pub price: Option<f64>,
    pub cost: Option<f64>,
    /// Present only when a price is active.
    pub metrics: Option<Metrics>,
}

pub struct Catalog {
    pub config: CatalogConfig,
    pub store: CatalogStore,
    clock: Arc<dyn Clock>,
    cache: ListingCache,
}

impl Catalog {
    /// Fails only when the configured cache TTL is out of range.
    pub fn new(config: CatalogConfig, store: CatalogStore, clock: Arc<dyn Clock>) -> CatalogResult<Self> {
        let ttl = config.cache_ttl()?;
        Ok(Self {
            cache: QueryCache::new(ttl, clock.clone()),
            config,
            store,
            clock,
        })
    }

    /// Open the configured database, apply the schema and wire everything.
    /// A missing database path is a fatal configuration error.
    pub fn open(config: CatalogConfig) -> CatalogResult<Self> {
        let path = config.require_database_path()?.to_string();
        config.cache_ttl()?;
        let store = CatalogStore::open(&path)?;
        store.migrate()?;
        log::info!(
            "catalog: opened {path} (history={:?}, cache ttl={}s)",
            config.history_mode,
            config.cache_ttl_secs
        );
        Self::new(config, store, Arc::new(SystemClock))
    }

    /// In-memory catalog on the wall clock.
    pub fn build_test() -> CatalogResult<Self> {
        Self::build_test_with(HistoryMode::Temporal, Arc::new(SystemClock))
    }

    /// In-memory catalog with a given history mode and a clock pinned to
    /// midnight of `today`.
    pub fn build_test_at(mode: HistoryMode, today: Date) -> CatalogResult<(Self, Arc<ManualClock>)> {
        let clock = Arc::new(ManualClock::at_date(today));
        let catalog = Self::build_test_with(mode, clock.clone())?;
        Ok((catalog, clock))
    }

    pub fn build_test_with(mode: HistoryMode, clock: Arc<dyn Clock>) -> CatalogResult<Self> {
        let store = CatalogStore::in_memory()?;
        store.migrate()?;
        let config = CatalogConfig::default_test().with_history_mode(mode);
        Self::new(config, store, clock)
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.store, self.config.history_mode)
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.store, &self.cache)
    }

    // ── Resolution and metrics ─────────────────────────────────

    pub fn resolve_price(
        &self,
        product_id: &str,
        as_of: Date,
        store_id: Option<&str>,
    ) -> CatalogResult<Option<TemporalRecord>> {
        self.resolver().price(product_id, as_of, store_id)
    }

    pub fn resolve_cost(&self, product_id: &str, as_of: Date) -> CatalogResult<Option<TemporalRecord>> {
        self.resolver().cost(product_id, as_of)
    }

    /// Metrics under the configured health bands.
    pub fn metrics(&self, price: f64, cost: Option<f64>) -> Metrics {
        metrics_with(price, cost, &self.config.thresholds)
    }

    // ── Mutations ──────────────────────────────────────────────

    pub fn reconcile(&self, rows: &[RawRow], kind: EntityKind) -> CatalogResult<ReconciliationResult> {
        self.reconciler().reconcile(rows, kind)
    }

    pub fn import_workbook(&self, workbook: &Workbook) -> CatalogResult<ImportReport> {
        self.reconciler().import_workbook(workbook)
    }

    pub fn purge(&self) -> CatalogResult<PurgeCounts> {
        self.reconciler().purge()
    }

    // ── Listing ────────────────────────────────────────────────

    /// Cache-backed product listing.
    pub fn listing(&self, search: &str, categories: &[String]) -> CatalogResult<Vec<ProductSummary>> {
        let key = ListingKey::new(search, categories);
        self.cache.get_or_compute(&key, || {
            self.store
                .search_products(search, categories, self.config.listing_limit)
        })
    }

    pub fn categories(&self) -> CatalogResult<Vec<String>> {
        self.store.distinct_categories()
    }

    /// Listing joined with active price, cost and metrics as of a date.
    /// An unknown `store_code` is treated as no store scope.
    pub fn cards(
        &self,
        search: &str,
        categories: &[String],
        as_of: Date,
        store_code: Option<&str>,
    ) -> CatalogResult<Vec<ProductCard>> {
        let store_id = match store_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let id = self.store.store_id_by_code(code)?;
                if id.is_none() {
                    log::debug!("catalog: unknown store code '{code}', listing without store scope");
                }
                id
            }
            None => None,
        };

        let resolver = self.resolver();
        self.listing(search, categories)?
            .into_iter()
            .map(|product| -> CatalogResult<ProductCard> {
                let price = resolver
                    .price(&product.id, as_of, store_id.as_deref())?
                    .map(|r| r.value);
                let cost = resolver.cost(&product.id, as_of)?.map(|r| r.value);
                let metrics = price.map(|p| self.metrics(p, cost));
                Ok(ProductCard {
                    product,
                    price,
                    cost,
                    metrics,
                })
            })
            .collect()
    }

    pub fn cached_listings(&self) -> usize {
        self.cache.len()
    }

    // ── Photos ─────────────────────────────────────────────────

    pub fn register_photo(&self, sku: &str, key: &str, taken_by: Option<&str>) -> CatalogResult<PhotoRecord> {
        photo::register(&self.store, sku, key, taken_by, self.clock.now())
    }

    pub fn upload_photo(
        &self,
        blob: &dyn BlobStore,
        sku: &str,
        file_name: &str,
        bytes: &[u8],
        taken_by: Option<&str>,
    ) -> CatalogResult<PhotoRecord> {
        photo::upload(&self.store, blob, sku, file_name, bytes, taken_by, self.clock.now())
    }

    pub fn gallery(&self, blob: &dyn BlobStore, sku: &str) -> CatalogResult<Vec<GalleryItem>> {
        photo::gallery(&self.store, blob, sku)
    }
}
