//! Dojo directory: approved dojos, nearest-first lookup and new submissions.

use crate::domain::documents::{collections, dojo_from_document, field};
use crate::domain::{DomainError, Dojo, Fields, GeoPoint};
use crate::ports::DocumentStore;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub struct DojoService {
    store: Arc<dyn DocumentStore>,
}

impl DojoService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Dojos shown on the map. Unapproved submissions are hidden.
    pub async fn approved(&self) -> Result<Vec<Dojo>, DomainError> {
        let docs = self.store.list(collections::DOJOS).await?;
        Ok(docs
            .iter()
            .filter_map(|d| match dojo_from_document(d) {
                Ok(dojo) => Some(dojo),
                Err(e) => {
                    warn!(id = %d.id, error = %e, "skipping malformed dojo");
                    None
                }
            })
            .filter(|d| d.approved)
            .collect())
    }

    /// Up to `limit` approved dojos with a location, closest first, with distance in km.
    pub async fn nearest(
        &self,
        from: GeoPoint,
        limit: usize,
    ) -> Result<Vec<(Dojo, f64)>, DomainError> {
        let mut located: Vec<(Dojo, f64)> = self
            .approved()
            .await?
            .into_iter()
            .filter_map(|d| {
                let km = d.location?.distance_km(&from);
                Some((d, km))
            })
            .collect();
        located.sort_by(|a, b| a.1.total_cmp(&b.1));
        located.truncate(limit);
        Ok(located)
    }

    /// Submit a dojo for review. It stays hidden until approved.
    pub async fn submit(&self, name: &str, location: GeoPoint) -> Result<String, DomainError> {
        let mut fields = Fields::new();
        fields.insert(field::NAME.into(), json!(name));
        fields.insert(
            field::LOCATION.into(),
            json!({"latitude": location.latitude, "longitude": location.longitude}),
        );
        fields.insert(field::APPROVED.into(), json!(false));
        fields.insert(field::SUBMITTED_AT.into(), json!(chrono::Utc::now().to_rfc3339()));
        let id = self.store.add(collections::DOJOS, fields).await?;
        info!(dojo_id = %id, name, "dojo submitted for review");
        Ok(id)
    }
}
