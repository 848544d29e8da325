//! Seed import: merge a JSON fixture into any DocumentStore.
//!
//! Format: `{ "<collection path>": { "<id>": { ...fields } } }`.
//! Documents within a collection are written in id order.

use crate::domain::{DomainError, Fields};
use crate::ports::DocumentStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

type SeedFile = BTreeMap<String, BTreeMap<String, Fields>>;

/// Parse seed JSON. Fails on anything that is not collection -> id -> object.
pub fn parse_seed(json: &str) -> Result<SeedFile, DomainError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| DomainError::Config(format!("seed JSON: {}", e)))?;
    serde_json::from_value(value).map_err(|e| DomainError::Config(format!("seed layout: {}", e)))
}

/// Merge every document of the seed into the store. Returns the number written.
pub async fn import_seed(store: &dyn DocumentStore, seed: SeedFile) -> Result<usize, DomainError> {
    let mut written = 0usize;
    for (collection, docs) in seed {
        for (id, fields) in docs {
            store.merge(&collection, &id, fields).await?;
            written += 1;
        }
        info!(collection = %collection, "seeded collection");
    }
    Ok(written)
}

/// Read `path` and import it.
pub async fn import_seed_file(
    store: &dyn DocumentStore,
    path: impl AsRef<Path>,
) -> Result<usize, DomainError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DomainError::Config(format!("read seed {}: {}", path.display(), e)))?;
    let written = import_seed(store, parse_seed(&json)?).await?;
    info!(path = %path.display(), written, "seed imported");
    Ok(written)
}
