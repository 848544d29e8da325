//! Firestore REST adapter. Implements DocumentStore against the hosted database.
//!
//! Calls are issued once: no retry, no timeout beyond reqwest's defaults.
//! `merge` uses an `updateMask`, so only the supplied fields change remotely.

use super::value::{document_id, fields_from_firestore, fields_to_firestore};
use crate::domain::{DomainError, Fields, StoredDocument};
use crate::ports::DocumentStore;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: &str = "300";

#[derive(Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreDocument {
    fn into_stored(self) -> StoredDocument {
        StoredDocument::new(document_id(&self.name), fields_from_firestore(&self.fields))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

/// Firestore REST client.
///
/// `api_key` is appended as `?key=`; `id_token` (a Firebase Auth ID token) is sent as bearer
/// so security rules see the signed-in learner.
pub struct FirestoreRestStore {
    client: Client,
    documents_url: String,
    api_key: Option<String>,
    id_token: Option<String>,
}

impl FirestoreRestStore {
    pub fn new(
        project_id: &str,
        database: &str,
        api_key: Option<String>,
        id_token: Option<String>,
    ) -> Self {
        Self::with_base_url(FIRESTORE_API, project_id, database, api_key, id_token)
    }

    /// Point at another endpoint (e.g. the local emulator).
    pub fn with_base_url(
        base_url: &str,
        project_id: &str,
        database: &str,
        api_key: Option<String>,
        id_token: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            documents_url: documents_url(base_url, project_id, database),
            api_key,
            id_token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.documents_url, path);
        let mut req = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key)]);
        }
        if let Some(token) = &self.id_token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(req: RequestBuilder, what: &str) -> Result<reqwest::Response, DomainError> {
        req.send()
            .await
            .map_err(|e| DomainError::DataUnavailable(format!("{} request failed: {}", what, e)))
    }

    async fn error_for(res: reqwest::Response, what: &str) -> DomainError {
        let status = res.status();
        let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
        DomainError::DataUnavailable(format!("{} failed with {}: {}", what, status, text))
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        res: reqwest::Response,
        what: &str,
    ) -> Result<T, DomainError> {
        res.json()
            .await
            .map_err(|e| DomainError::DataUnavailable(format!("{} response: {}", what, e)))
    }
}

/// `{base}/projects/{project}/databases/{database}/documents`
pub fn documents_url(base_url: &str, project_id: &str, database: &str) -> String {
    format!(
        "{}/projects/{}/databases/{}/documents",
        base_url.trim_end_matches('/'),
        project_id,
        database
    )
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreRestStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, DomainError> {
        let path = format!("{}/{}", collection, id);
        let res = Self::send(self.request(Method::GET, &path), "get").await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(Self::error_for(res, "get").await);
        }
        let doc: FirestoreDocument = Self::parse(res, "get").await?;
        Ok(Some(doc.into_stored()))
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, DomainError> {
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self
                .request(Method::GET, collection)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token)]);
            }
            let res = Self::send(req, "list").await?;
            if !res.status().is_success() {
                return Err(Self::error_for(res, "list").await);
            }
            let page: ListResponse = Self::parse(res, "list").await?;
            docs.extend(page.documents.into_iter().map(FirestoreDocument::into_stored));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        debug!(collection, count = docs.len(), "listed Firestore documents");
        Ok(docs)
    }

    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), DomainError> {
        // An empty mask would replace the whole document.
        if fields.is_empty() {
            return Ok(());
        }
        let path = format!("{}/{}", collection, id);
        let mask: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        let body = json!({ "fields": fields_to_firestore(&fields) });
        let res = Self::send(
            self.request(Method::PATCH, &path).query(&mask).json(&body),
            "merge",
        )
        .await?;
        if !res.status().is_success() {
            return Err(Self::error_for(res, "merge").await);
        }
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, DomainError> {
        let body = json!({ "fields": fields_to_firestore(&fields) });
        let res = Self::send(self.request(Method::POST, collection).json(&body), "add").await?;
        if !res.status().is_success() {
            return Err(Self::error_for(res, "add").await);
        }
        let doc: FirestoreDocument = Self::parse(res, "add").await?;
        Ok(document_id(&doc.name).to_string())
    }
}
