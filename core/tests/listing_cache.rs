//! Listing and query-cache tests: search, category filters, TTL staleness
//! and invalidation after catalog writes.

use catalog_core::catalog::Catalog;
use catalog_core::clock::ManualClock;
use catalog_core::config::HistoryMode;
use catalog_core::error::CatalogResult;
use catalog_core::import::{EntityKind, ProductRow, Sheet, Workbook};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

fn build() -> (Catalog, Arc<ManualClock>) {
    let today = NaiveDate::from_ymd_opt(2024, 8, 1).expect("valid date");
    Catalog::build_test_at(HistoryMode::Temporal, today).expect("build test catalog")
}

fn seed(catalog: &Catalog) -> CatalogResult<()> {
    let wb = Workbook::new().with_sheet(Sheet::from_cells(
        "products",
        &["sku", "name", "brand", "category"],
        vec![
            vec!["TEA-1", "Green Tea", "Leafy", "Drinks"],
            vec!["TEA-2", "Black Tea", "Leafy", "Drinks"],
            vec!["CUP-1", "Tea Cup", "Potter", "Kitchen"],
            vec!["PAN-1", "Frying Pan", "Potter", "Kitchen"],
            vec!["PCT-1", "100% Juice", "", "Drinks"],
        ],
    ));
    catalog.import_workbook(&wb)?;
    Ok(())
}

fn skus(catalog: &Catalog, search: &str, categories: &[&str]) -> CatalogResult<Vec<String>> {
    let categories: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
    Ok(catalog
        .listing(search, &categories)?
        .into_iter()
        .map(|p| p.sku)
        .collect())
}

// ── Search ──────────────────────────────────────────────────────

#[test]
fn search_matches_name_or_sku_case_insensitively() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    seed(&catalog)?;

    assert_eq!(skus(&catalog, "tea", &[])?, vec!["TEA-2", "TEA-1", "CUP-1"]);
    assert_eq!(skus(&catalog, "pan-1", &[])?, vec!["PAN-1"]);
    assert_eq!(skus(&catalog, "  ", &[])?.len(), 5);
    Ok(())
}

#[test]
fn wildcard_characters_match_literally() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    seed(&catalog)?;

    assert_eq!(skus(&catalog, "100%", &[])?, vec!["PCT-1"]);
    assert!(skus(&catalog, "%", &[])?.len() == 1);
    assert!(skus(&catalog, "_", &[])?.is_empty());
    Ok(())
}

#[test]
fn category_filter_restricts_the_listing() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    seed(&catalog)?;

    assert_eq!(skus(&catalog, "", &["Kitchen"])?, vec!["PAN-1", "CUP-1"]);
    assert_eq!(skus(&catalog, "tea", &["Kitchen"])?, vec!["CUP-1"]);
    assert_eq!(skus(&catalog, "", &["Drinks", "Kitchen"])?.len(), 5);
    assert!(skus(&catalog, "", &["Garden"])?.is_empty());

    assert_eq!(catalog.categories()?, vec!["Drinks", "Kitchen"]);
    Ok(())
}

// ── Cache ───────────────────────────────────────────────────────

#[test]
fn equivalent_queries_share_one_entry() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    seed(&catalog)?;

    skus(&catalog, "Tea", &["Kitchen", "Drinks"])?;
    skus(&catalog, " tea ", &["Drinks", "Kitchen"])?;
    assert_eq!(catalog.cached_listings(), 1);

    skus(&catalog, "tea", &["Drinks"])?;
    assert_eq!(catalog.cached_listings(), 2);
    Ok(())
}

#[test]
fn non_ascii_case_variants_do_not_share_an_entry() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    let sheet = Sheet::from_cells(
        "products",
        &["sku", "name", "category"],
        vec![vec!["PAS-1", "Éclair", "Bakery"]],
    );
    catalog.reconcile(sheet.rows(), EntityKind::Product)?;

    // SQLite folds ASCII only, so the lowercase accented term misses.
    let (uncached, _) = Catalog::build_test_at(HistoryMode::Temporal, catalog.today())?;
    uncached.reconcile(sheet.rows(), EntityKind::Product)?;
    assert!(skus(&uncached, "éclair", &[])?.is_empty());

    assert_eq!(skus(&catalog, "Éclair", &[])?, vec!["PAS-1"]);
    assert_eq!(
        skus(&catalog, "éclair", &[])?,
        skus(&uncached, "éclair", &[])?
    );
    assert_eq!(catalog.cached_listings(), 2);

    assert_eq!(skus(&catalog, "ÉCLAIR", &[])?, vec!["PAS-1"]);
    assert_eq!(catalog.cached_listings(), 2);
    Ok(())
}

#[test]
fn reconcile_invalidates_cached_listings() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    seed(&catalog)?;
    assert_eq!(skus(&catalog, "kettle", &[])?.len(), 0);
    assert_eq!(catalog.cached_listings(), 1);

    let sheet = Sheet::from_cells(
        "products",
        &["sku", "name", "category"],
        vec![vec!["KET-1", "Kettle", "Kitchen"]],
    );
    catalog.reconcile(sheet.rows(), EntityKind::Product)?;
    assert_eq!(catalog.cached_listings(), 0);
    assert_eq!(skus(&catalog, "kettle", &[])?, vec!["KET-1"]);
    Ok(())
}

#[test]
fn unchanged_batch_keeps_the_cache() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    seed(&catalog)?;
    skus(&catalog, "", &[])?;

    let same = Sheet::from_cells(
        "products",
        &["sku", "name", "brand", "category"],
        vec![vec!["TEA-1", "Green Tea", "Leafy", "Drinks"]],
    );
    let result = catalog.reconcile(same.rows(), EntityKind::Product)?;
    assert_eq!(result.changed(), 0);
    assert_eq!(catalog.cached_listings(), 1);
    Ok(())
}

#[test]
fn out_of_band_write_is_visible_after_the_ttl() -> CatalogResult<()> {
    let (catalog, clock) = build();
    seed(&catalog)?;
    assert!(skus(&catalog, "kettle", &[])?.is_empty());

    // A write that bypasses the reconciler does not touch the cache.
    catalog.store.upsert_product(&ProductRow {
        sku: "KET-1".into(),
        name: "Kettle".into(),
        brand: None,
        category: Some("Kitchen".into()),
        status: "active".into(),
        photo_url: None,
    })?;

    clock.advance(Duration::seconds(30));
    assert!(skus(&catalog, "kettle", &[])?.is_empty(), "stale within ttl");

    clock.advance(Duration::seconds(31));
    assert_eq!(skus(&catalog, "kettle", &[])?, vec!["KET-1"]);
    Ok(())
}

#[test]
fn purge_clears_the_cache() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    seed(&catalog)?;
    assert_eq!(skus(&catalog, "", &[])?.len(), 5);

    catalog.purge()?;
    assert_eq!(catalog.cached_listings(), 0);
    assert!(skus(&catalog, "", &[])?.is_empty());
    Ok(())
}
