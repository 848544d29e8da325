//! In-memory DocumentStore.
//!
//! Keeps documents in insertion order per collection. Collections can be marked
//! unreachable to exercise the data-unavailable paths, and writes are counted.

use crate::domain::{DomainError, Fields, StoredDocument};
use crate::ports::DocumentStore;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<StoredDocument>>,
    unreachable: HashSet<String>,
    writes: usize,
}

impl MemoryState {
    fn check(&self, collection: &str) -> Result<(), DomainError> {
        if self.unreachable.contains(collection) {
            return Err(DomainError::DataUnavailable(format!(
                "collection {} unreachable",
                collection
            )));
        }
        Ok(())
    }
}

/// Process-local document store.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<MemoryState>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a document without counting it as a write. Replaces an existing one.
    pub async fn insert(&self, collection: &str, id: &str, fields: Fields) {
        let mut state = self.state.write().await;
        let docs = state.collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.fields = fields,
            None => docs.push(StoredDocument::new(id, fields)),
        }
    }

    /// Make every call on `collection` fail with `DataUnavailable`.
    pub async fn set_unreachable(&self, collection: &str, unreachable: bool) {
        let mut state = self.state.write().await;
        if unreachable {
            state.unreachable.insert(collection.to_string());
        } else {
            state.unreachable.remove(collection);
        }
    }

    /// Number of `merge`/`add` calls that reached the store.
    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    /// Peek at a document, bypassing reachability.
    pub async fn snapshot(&self, collection: &str, id: &str) -> Option<Fields> {
        let state = self.state.read().await;
        state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .map(|d| d.fields.clone())
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, DomainError> {
        let state = self.state.read().await;
        state.check(collection)?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, DomainError> {
        let state = self.state.read().await;
        state.check(collection)?;
        Ok(state.collections.get(collection).cloned().unwrap_or_default())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state.check(collection)?;
        state.writes += 1;
        let docs = state.collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.fields.extend(fields),
            None => docs.push(StoredDocument::new(id, fields)),
        }
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, DomainError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut state = self.state.write().await;
        state.check(collection)?;
        state.writes += 1;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument::new(id.clone(), fields));
        Ok(id)
    }
}
