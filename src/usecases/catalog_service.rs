//! Catalog aggregation: category -> waza -> technique tree, lessons and terminology.
//!
//! - One `list` per parent node; siblings are fetched concurrently, order is kept as fetched
//! - Missing optional fields default in `domain::documents`; malformed children are skipped
//! - Read-only and idempotent, safe to call repeatedly and concurrently

use crate::domain::documents::{
    category_from_document, collections, lesson_from_document, technique_from_document,
    term_from_document, waza_from_document,
};
use crate::domain::{DomainError, Lesson, StoredDocument, Technique, TechniqueCategory, Term, Waza};
use crate::ports::DocumentStore;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decode each document, logging and dropping the ones that do not fit the schema.
fn decode_all<T>(
    collection: &str,
    docs: &[StoredDocument],
    decode: impl Fn(&StoredDocument) -> Result<T, DomainError>,
) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match decode(doc) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(collection, id = %doc.id, error = %e, "skipping malformed document");
                None
            }
        })
        .collect()
}

/// Catalog service. Builds read-through views of the catalog collections.
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Whole technique tree. Fails with `DataUnavailable` when any level cannot be listed.
    pub async fn fetch_catalog(&self) -> Result<Vec<TechniqueCategory>, DomainError> {
        let docs = self.store.list(collections::TECHNIQUES).await?;
        let categories = decode_all(collections::TECHNIQUES, &docs, category_from_document);
        let tree = try_join_all(categories.into_iter().map(|c| self.fill_category(c))).await?;
        debug!(categories = tree.len(), "catalog aggregated");
        Ok(tree)
    }

    /// One category with its wazas and techniques.
    pub async fn fetch_category(&self, category_id: &str) -> Result<TechniqueCategory, DomainError> {
        let doc = self
            .store
            .get(collections::TECHNIQUES, category_id)
            .await?
            .ok_or_else(|| DomainError::not_found(collections::TECHNIQUES, category_id))?;
        self.fill_category(category_from_document(&doc)?).await
    }

    /// One waza with its techniques.
    pub async fn fetch_waza(&self, category_id: &str, waza_id: &str) -> Result<Waza, DomainError> {
        let collection = collections::wazas(category_id);
        let doc = self
            .store
            .get(&collection, waza_id)
            .await?
            .ok_or_else(|| DomainError::not_found(&collection, waza_id))?;
        self.fill_waza(waza_from_document(category_id, &doc)?).await
    }

    pub async fn fetch_technique(
        &self,
        category_id: &str,
        waza_id: &str,
        technique_id: &str,
    ) -> Result<Technique, DomainError> {
        let collection = collections::waza_techniques(category_id, waza_id);
        let doc = self
            .store
            .get(&collection, technique_id)
            .await?
            .ok_or_else(|| DomainError::not_found(&collection, technique_id))?;
        technique_from_document(category_id, waza_id, &doc)
    }

    pub async fn fetch_lessons(&self) -> Result<Vec<Lesson>, DomainError> {
        let docs = self.store.list(collections::LESSONS).await?;
        Ok(decode_all(collections::LESSONS, &docs, lesson_from_document))
    }

    pub async fn list_terms(&self) -> Result<Vec<Term>, DomainError> {
        let docs = self.store.list(collections::TERMS).await?;
        Ok(decode_all(collections::TERMS, &docs, term_from_document))
    }

    /// Terms referenced by a lesson, in the lesson's order. Absent ids are skipped.
    pub async fn terms_for_lesson(&self, lesson: &Lesson) -> Result<Vec<Term>, DomainError> {
        let docs = try_join_all(
            lesson
                .terminology
                .iter()
                .map(|id| self.store.get(collections::TERMS, id)),
        )
        .await?;
        let mut terms = Vec::with_capacity(docs.len());
        for (id, doc) in lesson.terminology.iter().zip(docs) {
            match doc {
                Some(doc) => terms.push(term_from_document(&doc)?),
                None => warn!(lesson_id = %lesson.id, term_id = %id, "lesson references missing term"),
            }
        }
        Ok(terms)
    }

    async fn fill_category(
        &self,
        mut category: TechniqueCategory,
    ) -> Result<TechniqueCategory, DomainError> {
        let collection = collections::wazas(&category.id);
        let docs = self.store.list(&collection).await?;
        let wazas = decode_all(&collection, &docs, |d| waza_from_document(&category.id, d));
        category.wazas = try_join_all(wazas.into_iter().map(|w| self.fill_waza(w))).await?;
        Ok(category)
    }

    async fn fill_waza(&self, mut waza: Waza) -> Result<Waza, DomainError> {
        let collection = collections::waza_techniques(&waza.category_id, &waza.id);
        let docs = self.store.list(&collection).await?;
        waza.techniques = decode_all(&collection, &docs, |d| {
            technique_from_document(&waza.category_id, &waza.id, d)
        });
        Ok(waza)
    }
}

/// Locate a technique anywhere in an aggregated tree.
pub fn find_technique<'a>(
    catalog: &'a [TechniqueCategory],
    technique_id: &str,
) -> Option<&'a Technique> {
    catalog
        .iter()
        .flat_map(|c| &c.wazas)
        .flat_map(|w| &w.techniques)
        .find(|t| t.id == technique_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryDocumentStore;
    use crate::domain::documents::{UNKNOWN_CATEGORY, UNKNOWN_TECHNIQUE, UNKNOWN_WAZA, fields_from};
    use serde_json::json;

    async fn seeded_store() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .insert(
                "techniques",
                "nage",
                fields_from(json!({"original": "Nage-waza", "title": {"en": "Throwing"}, "emoji": "🥋"})),
            )
            .await;
        store
            .insert("techniques", "katame", fields_from(json!({"title": {"en": "Grappling"}})))
            .await;
        store
            .insert("techniques/nage/wazas", "te", fields_from(json!({"original": "Te-waza"})))
            .await;
        store
            .insert("techniques/nage/wazas", "ashi", fields_from(json!({})))
            .await;
        store
            .insert(
                "techniques/nage/wazas/te/techniques",
                "seoi",
                fields_from(json!({"original": "Seoi-nage", "xp": 150, "video": "seoi.mp4"})),
            )
            .await;
        store
            .insert("techniques/nage/wazas/te/techniques", "tai", fields_from(json!({})))
            .await;
        store
    }

    #[tokio::test]
    async fn test_fetch_catalog_builds_tree_in_fetch_order() {
        let store = seeded_store().await;
        let service = CatalogService::new(store);

        let catalog = service.fetch_catalog().await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].id, "nage");
        assert_eq!(catalog[0].original, "Nage-waza");
        assert_eq!(catalog[1].original, UNKNOWN_CATEGORY);
        assert!(catalog[1].wazas.is_empty());

        let wazas = &catalog[0].wazas;
        assert_eq!(wazas.iter().map(|w| w.id.as_str()).collect::<Vec<_>>(), ["te", "ashi"]);
        assert_eq!(wazas[1].original, UNKNOWN_WAZA);

        let techniques = &wazas[0].techniques;
        assert_eq!(techniques.len(), 2);
        assert_eq!(techniques[0].xp, 150);
        assert_eq!(techniques[1].original, UNKNOWN_TECHNIQUE);
        assert!(techniques[1].title.is_empty());
        assert!(techniques[1].description.is_empty());
        assert_eq!(techniques[1].xp, 0);

        assert_eq!(find_technique(&catalog, "seoi").map(|t| t.waza_id.as_str()), Some("te"));
        assert!(find_technique(&catalog, "uchi-mata").is_none());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_an_error() {
        let service = CatalogService::new(Arc::new(InMemoryDocumentStore::new()));
        assert!(service.fetch_catalog().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_parent_is_data_unavailable() {
        let store = seeded_store().await;
        store.set_unreachable("techniques", true).await;
        let service = CatalogService::new(store.clone());
        let err = service.fetch_catalog().await.unwrap_err();
        assert!(matches!(err, DomainError::DataUnavailable(_)));

        // pull-to-refresh re-runs the same aggregation
        store.set_unreachable("techniques", false).await;
        assert_eq!(service.fetch_catalog().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_child_is_skipped() {
        let store = seeded_store().await;
        store
            .insert("techniques/nage/wazas/te/techniques", "bad", fields_from(json!({"xp": 5, "title": 3})))
            .await;
        let service = CatalogService::new(store);
        let waza = service.fetch_waza("nage", "te").await.unwrap();
        assert_eq!(waza.techniques.len(), 2);
    }

    #[tokio::test]
    async fn test_null_translation_does_not_drop_technique() {
        let store = seeded_store().await;
        store
            .insert(
                "techniques/nage/wazas/te/techniques",
                "seoi",
                fields_from(json!({"original": "Seoi-nage", "title": {"en": "Shoulder throw", "fr": null}, "xp": 150})),
            )
            .await;
        let catalog = CatalogService::new(store).fetch_catalog().await.unwrap();
        let seoi = find_technique(&catalog, "seoi").unwrap();
        assert_eq!(seoi.title.resolve("fr"), "Shoulder throw");
        assert_eq!(catalog[0].wazas[0].techniques.len(), 2);
    }

    #[tokio::test]
    async fn test_scoped_fetches() {
        let service = CatalogService::new(seeded_store().await);

        let category = service.fetch_category("nage").await.unwrap();
        assert_eq!(category.wazas.len(), 2);

        let technique = service.fetch_technique("nage", "te", "seoi").await.unwrap();
        assert_eq!(technique.video, "seoi.mp4");

        let err = service.fetch_category("shime").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { ref id, .. } if id == "shime"));
        assert!(matches!(
            service.fetch_waza("nage", "sutemi").await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_terms_for_lesson_keeps_order_and_skips_missing() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .insert("terms", "rei", fields_from(json!({"original": "Rei", "translation": {"en": "Bow"}})))
            .await;
        store
            .insert("terms", "hajime", fields_from(json!({"original": "Hajime"})))
            .await;
        store
            .insert(
                "lessons",
                "l1",
                fields_from(json!({"xp": 100, "terminology": ["hajime", "matte", "rei"]})),
            )
            .await;
        let service = CatalogService::new(store);

        let lessons = service.fetch_lessons().await.unwrap();
        let terms = service.terms_for_lesson(&lessons[0]).await.unwrap();
        assert_eq!(terms.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["hajime", "rei"]);
        assert_eq!(service.list_terms().await.unwrap().len(), 2);
    }
}
