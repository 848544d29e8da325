//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, Fields, StoredDocument};

/// Hosted document database. Collections are slash-separated paths
/// (`techniques/{category}/wazas`); documents are keyed by id.
///
/// No transactions or batch atomicity: every call stands alone and callers
/// doing read-then-write accept that a concurrent writer may be overwritten.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, DomainError>;

    /// List every document of a collection in the store's fetch order.
    /// A collection that was never written is empty, not an error.
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, DomainError>;

    /// Write-merge: only the supplied top-level fields change; others are left untouched.
    /// Creates the document when absent.
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), DomainError>;

    /// Create a document with a store-generated id and return that id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, DomainError>;
}
