//! Shared primitive types used across the entire catalog.

/// A stable, unique identifier for any persisted entity (UUID text).
pub type EntityId = String;

pub type ProductId = EntityId;

pub type StoreId = EntityId;

/// Validity windows are day-granular, with no time zone.
pub type Date = chrono::NaiveDate;
