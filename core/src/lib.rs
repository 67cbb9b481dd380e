//! Product catalog core: temporal price/cost resolution, margin metrics,
//! spreadsheet reconciliation and a cached listing, over SQLite.

pub mod access;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod import;
pub mod metrics;
pub mod photo;
pub mod reconciler;
pub mod resolver;
pub mod store;
pub mod types;
