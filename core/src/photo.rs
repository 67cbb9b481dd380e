//! Product photos. The catalog only stores opaque blob keys; bytes and
//! display URLs belong to a blob-storage collaborator behind `BlobStore`.

use crate::{
    error::{CatalogError, CatalogResult},
    store::{CatalogStore, PhotoRecord},
    types::ProductId,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Most recent photos shown per product.
pub const GALLERY_LIMIT: usize = 30;
/// Lifetime of a display URL handed out by the gallery.
pub const URL_EXPIRY: Duration = Duration::from_secs(300);

/// Upload or presign failure. Transient: report it and move on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("blob storage: {0}")]
pub struct BlobError(pub String);

pub trait BlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError>;

    fn display_url(&self, key: &str, expires_in: Duration) -> Result<String, BlobError>;
}

#[derive(Debug, Clone)]
pub struct GalleryItem {
    pub key: String,
    pub taken_by: Option<String>,
    pub taken_at: DateTime<Utc>,
    pub url: Result<String, BlobError>,
}

/// `{product_id}/{uuid}{ext}`, extension lower-cased, `.jpg` when absent.
pub fn photo_key(product_id: &str, file_name: &str) -> String {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| ".jpg".to_string());
    format!("{product_id}/{}{ext}", uuid::Uuid::new_v4())
}

fn require_product(store: &CatalogStore, sku: &str) -> CatalogResult<ProductId> {
    store
        .product_id_by_sku(sku)?
        .ok_or_else(|| CatalogError::UnresolvedReference {
            field: "sku",
            value: sku.to_string(),
        })
}

/// Record a key that already lives in blob storage.
pub fn register(
    store: &CatalogStore,
    sku: &str,
    key: &str,
    taken_by: Option<&str>,
    taken_at: DateTime<Utc>,
) -> CatalogResult<PhotoRecord> {
    let product_id = require_product(store, sku)?;
    let photo = store.insert_photo(&product_id, key, taken_by, taken_at)?;
    log::info!("photo: registered {} for {sku}", photo.key);
    Ok(photo)
}

/// Put the bytes, then record the key. Nothing is recorded if the put fails.
pub fn upload(
    store: &CatalogStore,
    blob: &dyn BlobStore,
    sku: &str,
    file_name: &str,
    bytes: &[u8],
    taken_by: Option<&str>,
    taken_at: DateTime<Utc>,
) -> CatalogResult<PhotoRecord> {
    let product_id = require_product(store, sku)?;
    let key = photo_key(&product_id, file_name);
    blob.put(&key, bytes)?;
    let photo = store.insert_photo(&product_id, &key, taken_by, taken_at)?;
    log::info!("photo: uploaded {} ({} bytes) for {sku}", photo.key, bytes.len());
    Ok(photo)
}

/// Recent photos with display URLs. A URL failure marks that item only.
pub fn gallery(store: &CatalogStore, blob: &dyn BlobStore, sku: &str) -> CatalogResult<Vec<GalleryItem>> {
    let Some(product_id) = store.product_id_by_sku(sku)? else {
        return Ok(Vec::new());
    };
    let items = store
        .recent_photos(&product_id, GALLERY_LIMIT)?
        .into_iter()
        .map(|photo| {
            let url = blob.display_url(&photo.key, URL_EXPIRY);
            if let Err(e) = &url {
                log::warn!("photo: no display url for {}: {e}", photo.key);
            }
            GalleryItem {
                key: photo.key,
                taken_by: photo.taken_by,
                taken_at: photo.taken_at,
                url,
            }
        })
        .collect();
    Ok(items)
}

/// Process-local blob store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `display_url` for `key` fail.
    pub fn mark_unavailable(&self, key: &str) {
        self.unavailable.lock().push(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        self.objects.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn display_url(&self, key: &str, expires_in: Duration) -> Result<String, BlobError> {
        if self.unavailable.lock().iter().any(|k| k == key) || !self.contains(key) {
            return Err(BlobError(format!("object '{key}' unavailable")));
        }
        Ok(format!("memory://{key}?expires={}", expires_in.as_secs()))
    }
}
