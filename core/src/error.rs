use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mandatory storage settings are absent. Fatal: nothing can run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unresolved reference: no {field} '{value}'")]
    UnresolvedReference { field: &'static str, value: String },

    #[error(transparent)]
    Blob(#[from] crate::photo::BlobError),

    #[error("Role '{role}' may not modify the catalog")]
    Forbidden { role: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
