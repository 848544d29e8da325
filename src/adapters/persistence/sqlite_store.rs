//! SQLite-backed DocumentStore via libsql. Local mirror of the hosted collections.
//!
//! Single `documents` table keyed by (collection, id); bodies are JSON objects.
//! `seq` preserves insertion order so `list` matches the fetch order of the remote store.
//! All collections share one database file: data/documents.db

use crate::domain::{DomainError, Fields, StoredDocument};
use crate::ports::DocumentStore;
use libsql::{Database, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DOCUMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL DEFAULT '{}',
    updated_at INTEGER NOT NULL,
    UNIQUE (collection, id)
)"#;
const DOCUMENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection, seq)";

fn store_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::DataUnavailable(format!("sqlite: {}", e))
}

/// SQLite document store. One database file (documents.db) in the given base directory.
pub struct SqliteDocumentStore {
    db: Database,
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    /// Connect to (or create) the database and ensure the schema exists.
    /// Call once at startup; the returned store is safe to share via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(store_err)?;
        let db_path = base.join("documents.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(store_err)?;
        let conn = db.connect().map_err(store_err)?;

        // PRAGMA returns a row; consume it (execute fails when rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| store_err(format!("WAL pragma failed: {}", e)))?;
        while wal_rows.next().await.map_err(store_err)?.is_some() {}

        conn.execute(DOCUMENTS_TABLE, ()).await.map_err(store_err)?;
        conn.execute(DOCUMENTS_INDEX, ()).await.map_err(store_err)?;

        info!(path = %db_path.display(), "SQLite document store connected");

        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn parse_body(collection: &str, id: &str, body: &str) -> Result<Fields, DomainError> {
        serde_json::from_str(body).map_err(|e| DomainError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, DomainError> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .await
            .map_err(store_err)?;
        match rows.next().await.map_err(store_err)? {
            Some(row) => {
                let body: String = row.get(0).map_err(store_err)?;
                let fields = Self::parse_body(collection, id, &body)?;
                Ok(Some(StoredDocument::new(id, fields)))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, DomainError> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY seq",
                params![collection],
            )
            .await
            .map_err(store_err)?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let id: String = row.get(0).map_err(store_err)?;
            let body: String = row.get(1).map_err(store_err)?;
            let fields = Self::parse_body(collection, &id, &body)?;
            docs.push(StoredDocument::new(id, fields));
        }
        debug!(collection, count = docs.len(), "listed documents");
        Ok(docs)
    }

    /// Reads the current body and writes the merged one inside a transaction,
    /// so a merge from this process never loses fields of a concurrent local merge.
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), DomainError> {
        let conn = self.db.connect().map_err(store_err)?;
        let tx = conn.transaction().await.map_err(store_err)?;
        let mut rows = tx
            .query(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .await
            .map_err(store_err)?;
        let mut merged = match rows.next().await.map_err(store_err)? {
            Some(row) => {
                let body: String = row.get(0).map_err(store_err)?;
                Self::parse_body(collection, id, &body)?
            }
            None => Fields::new(),
        };
        drop(rows);
        merged.extend(fields);
        let body = serde_json::Value::Object(merged).to_string();
        tx.execute(
            r#"
            INSERT INTO documents (collection, id, body, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (collection, id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
            params![collection, id, body, Self::now()],
        )
        .await
        .map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, DomainError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let conn = self.db.connect().map_err(store_err)?;
        let body = serde_json::Value::Object(fields).to_string();
        conn.execute(
            "INSERT INTO documents (collection, id, body, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![collection, id.as_str(), body, Self::now()],
        )
        .await
        .map_err(store_err)?;
        Ok(id)
    }
}
