//! Photo gallery, access control and configuration tests.

use catalog_core::access::{ensure_admin, CurrentUser, Role};
use catalog_core::catalog::Catalog;
use catalog_core::clock::{ManualClock, SystemClock};
use catalog_core::config::{CatalogConfig, HistoryMode};
use catalog_core::error::{CatalogError, CatalogResult};
use catalog_core::import::{EntityKind, Sheet};
use catalog_core::photo::{photo_key, MemoryBlobStore, GALLERY_LIMIT};
use catalog_core::store::CatalogStore;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

fn build() -> (Catalog, Arc<ManualClock>) {
    let today = NaiveDate::from_ymd_opt(2024, 8, 1).expect("valid date");
    let (catalog, clock) =
        Catalog::build_test_at(HistoryMode::Temporal, today).expect("build test catalog");
    let sheet = Sheet::from_cells(
        "products",
        &["sku", "name"],
        vec![vec!["SKU-1", "Widget"], vec!["SKU-2", "Gadget"]],
    );
    catalog
        .reconcile(sheet.rows(), EntityKind::Product)
        .expect("seed products");
    (catalog, clock)
}

// ── Photos ──────────────────────────────────────────────────────

#[test]
fn gallery_lists_newest_first() -> CatalogResult<()> {
    let (catalog, clock) = build();
    let blob = MemoryBlobStore::new();

    let first = catalog.upload_photo(&blob, "SKU-1", "front.PNG", b"png", Some("chef@kitchen"))?;
    clock.advance(Duration::minutes(5));
    let second = catalog.upload_photo(&blob, "SKU-1", "back", b"jpg", None)?;

    assert!(first.key.ends_with(".png"));
    assert!(second.key.ends_with(".jpg"), "extension defaults to .jpg");
    assert!(blob.contains(&first.key));

    let gallery = catalog.gallery(&blob, "SKU-1")?;
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery[0].key, second.key);
    assert_eq!(gallery[1].key, first.key);
    assert_eq!(gallery[1].taken_by.as_deref(), Some("chef@kitchen"));
    assert!(gallery.iter().all(|item| item.url.is_ok()));
    Ok(())
}

#[test]
fn one_failed_url_does_not_hide_the_others() -> CatalogResult<()> {
    let (catalog, clock) = build();
    let blob = MemoryBlobStore::new();

    let broken = catalog.upload_photo(&blob, "SKU-1", "a.jpg", b"a", None)?;
    clock.advance(Duration::seconds(1));
    let fine = catalog.upload_photo(&blob, "SKU-1", "b.jpg", b"b", None)?;
    blob.mark_unavailable(&broken.key);

    let gallery = catalog.gallery(&blob, "SKU-1")?;
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery[0].key, fine.key);
    assert!(gallery[0].url.is_ok());
    assert!(gallery[1].url.is_err());
    Ok(())
}

#[test]
fn registered_key_without_blob_has_no_url() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    let blob = MemoryBlobStore::new();

    let photo = catalog.register_photo("SKU-2", "legacy/123.jpg", Some("import"))?;
    assert_eq!(catalog.store.photo_count()?, 1);

    let gallery = catalog.gallery(&blob, "SKU-2")?;
    assert_eq!(gallery[0].key, photo.key);
    assert!(gallery[0].url.is_err());
    Ok(())
}

#[test]
fn gallery_is_capped() -> CatalogResult<()> {
    let (catalog, clock) = build();
    let blob = MemoryBlobStore::new();
    for i in 0..GALLERY_LIMIT + 3 {
        catalog.register_photo("SKU-1", &format!("k/{i}.jpg"), None)?;
        clock.advance(Duration::seconds(1));
    }
    assert_eq!(catalog.gallery(&blob, "SKU-1")?.len(), GALLERY_LIMIT);
    Ok(())
}

#[test]
fn unknown_sku_has_an_empty_gallery_and_rejects_uploads() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    let blob = MemoryBlobStore::new();

    assert!(catalog.gallery(&blob, "NOPE")?.is_empty());

    let err = catalog
        .upload_photo(&blob, "NOPE", "x.jpg", b"x", None)
        .unwrap_err();
    assert!(matches!(err, CatalogError::UnresolvedReference { field: "sku", .. }));
    assert_eq!(catalog.store.photo_count()?, 0);
    Ok(())
}

#[test]
fn photo_keys_are_scoped_by_product() {
    let a = photo_key("p-1", "shot.JPEG");
    let b = photo_key("p-1", "shot.JPEG");
    assert!(a.starts_with("p-1/"));
    assert!(a.ends_with(".jpeg"));
    assert_ne!(a, b);
}

#[test]
fn product_delete_and_purge_remove_photos() -> CatalogResult<()> {
    let (catalog, _clock) = build();
    catalog.register_photo("SKU-1", "k/1.jpg", None)?;
    catalog.register_photo("SKU-2", "k/2.jpg", None)?;

    catalog.store.delete_product("SKU-1")?;
    assert_eq!(catalog.store.photo_count()?, 1);

    let counts = catalog.purge()?;
    assert_eq!(counts.photos, 1);
    assert_eq!(catalog.store.photo_count()?, 0);
    Ok(())
}

// ── Access ──────────────────────────────────────────────────────

#[test]
fn only_admins_may_mutate() {
    assert!(ensure_admin(&CurrentUser::new("boss@kitchen", Role::Admin)).is_ok());

    for role in [Role::Chef, Role::Viewer] {
        let err = ensure_admin(&CurrentUser::new("cook@kitchen", role)).unwrap_err();
        assert!(matches!(err, CatalogError::Forbidden { .. }), "{role:?}");
    }
}

#[test]
fn roles_parse_case_insensitively() {
    assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!(" chef ".parse::<Role>().unwrap(), Role::Chef);
    assert!("owner".parse::<Role>().is_err());
}

// ── Configuration ───────────────────────────────────────────────

#[test]
fn missing_database_path_is_fatal() {
    let config = CatalogConfig {
        database_path: None,
        ..CatalogConfig::default()
    };
    let err = Catalog::open(config).err().expect("open must fail");
    assert!(matches!(err, CatalogError::Configuration(_)));

    let blank = CatalogConfig {
        database_path: Some("   ".into()),
        ..CatalogConfig::default()
    };
    assert!(blank.require_database_path().is_err());
}

#[test]
fn out_of_range_cache_ttl_is_a_configuration_error() -> CatalogResult<()> {
    for secs in [10_000_000_000_000_000, u64::MAX] {
        let config = CatalogConfig {
            cache_ttl_secs: secs,
            ..CatalogConfig::default_test()
        };
        assert!(matches!(config.cache_ttl(), Err(CatalogError::Configuration(_))));

        let err = Catalog::new(config.clone(), CatalogStore::in_memory()?, Arc::new(SystemClock))
            .err()
            .expect("huge ttl must be rejected");
        assert!(matches!(err, CatalogError::Configuration(_)), "{secs}");
        assert!(matches!(Catalog::open(config), Err(CatalogError::Configuration(_))));
    }

    let config = CatalogConfig {
        cache_ttl_secs: 86_400,
        ..CatalogConfig::default_test()
    };
    assert_eq!(config.cache_ttl()?, Duration::days(1));
    Ok(())
}

#[test]
fn history_mode_parses_known_names_only() {
    assert_eq!("temporal".parse::<HistoryMode>().unwrap(), HistoryMode::Temporal);
    assert_eq!("single_value".parse::<HistoryMode>().unwrap(), HistoryMode::SingleValue);
    assert!(matches!(
        "weekly".parse::<HistoryMode>(),
        Err(CatalogError::Configuration(_))
    ));
}

#[test]
fn file_database_persists_across_opens() -> CatalogResult<()> {
    let path = std::env::temp_dir().join(format!("catalog-{}.sqlite", uuid::Uuid::new_v4()));
    let path_text = path.to_string_lossy().into_owned();
    let config = CatalogConfig {
        database_path: Some(path_text.clone()),
        ..CatalogConfig::default()
    };

    {
        let catalog = Catalog::open(config.clone())?;
        let sheet = Sheet::from_cells("stores", &["code", "name"], vec![vec!["S01", "Downtown"]]);
        catalog.reconcile(sheet.rows(), EntityKind::Store)?;
    }

    let reopened = Catalog::open(config)?;
    assert_eq!(reopened.store.store_count()?, 1);
    assert_eq!(reopened.store.path(), Some(path_text.as_str()));
    drop(reopened);

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path_text}{suffix}"));
    }
    Ok(())
}
