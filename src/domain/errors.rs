//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Referenced document is absent. Surfaced to the user as an alert.
    #[error("Not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Network or store failure during a get, list or write. Retry is user-initiated.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A present field could not be decoded (missing optional fields never end up here).
    #[error("Malformed document {collection}/{id}: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),
}

impl DomainError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// True for failures a pull-to-refresh may resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::DataUnavailable(_))
    }
}
