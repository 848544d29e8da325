//! In-memory state for screens: current profile, lesson list and technique catalog.
//!
//! - `load_all` fetches lessons and the catalog concurrently; a failed fetch is logged and
//!   leaves its collection empty without aborting the other one
//! - Load status is published on a `watch` channel (`Idle -> Loading -> Ready | PartiallyFailed`)
//! - Overlapping loads are not serialized: each one overwrites the cache when it settles,
//!   so the last fetch to finish wins

use crate::domain::{
    DomainError, Lesson, ProfileUpdate, Progression, TechniqueCategory, User, progression_for,
};
use crate::usecases::catalog_service::CatalogService;
use crate::usecases::progress_service::{CompletionOutcome, ProgressService};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{info, warn};

/// Observable state of the lesson/catalog cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    /// At least one fetch failed; its collection is empty until the next refresh.
    PartiallyFailed { lessons: bool, catalog: bool },
}

impl LoadStatus {
    pub fn is_loading(self) -> bool {
        self == LoadStatus::Loading
    }
}

#[derive(Debug, Default)]
struct Cache {
    lessons: Vec<Lesson>,
    catalog: Vec<TechniqueCategory>,
    profile: Option<User>,
}

/// Explicitly injected state object shared by the UI layer.
pub struct LearningStore {
    catalog_service: Arc<CatalogService>,
    progress_service: Arc<ProgressService>,
    cache: RwLock<Cache>,
    status: watch::Sender<LoadStatus>,
}

impl LearningStore {
    pub fn new(catalog_service: Arc<CatalogService>, progress_service: Arc<ProgressService>) -> Self {
        let (status, _) = watch::channel(LoadStatus::Idle);
        Self {
            catalog_service,
            progress_service,
            cache: RwLock::new(Cache::default()),
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> LoadStatus {
        *self.status.borrow()
    }

    pub async fn lessons(&self) -> Vec<Lesson> {
        self.cache.read().await.lessons.clone()
    }

    pub async fn catalog(&self) -> Vec<TechniqueCategory> {
        self.cache.read().await.catalog.clone()
    }

    pub async fn profile(&self) -> Option<User> {
        self.cache.read().await.profile.clone()
    }

    /// Progression of the cached profile, if one is loaded.
    pub async fn progression(&self) -> Option<Progression> {
        self.cache
            .read()
            .await
            .profile
            .as_ref()
            .map(|u| progression_for(u.xp))
    }

    /// Fetch lessons and catalog concurrently. Never fails; see `LoadStatus`.
    pub async fn load_all(&self) -> LoadStatus {
        self.status.send_replace(LoadStatus::Loading);

        let (lessons, catalog) = tokio::join!(
            self.catalog_service.fetch_lessons(),
            self.catalog_service.fetch_catalog()
        );

        let lessons_failed = lessons.is_err();
        let catalog_failed = catalog.is_err();
        let lessons = lessons.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load lessons");
            Vec::new()
        });
        let catalog = catalog.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load technique catalog");
            Vec::new()
        });

        info!(lessons = lessons.len(), categories = catalog.len(), "learning data loaded");
        {
            let mut cache = self.cache.write().await;
            cache.lessons = lessons;
            cache.catalog = catalog;
        }

        let status = if lessons_failed || catalog_failed {
            LoadStatus::PartiallyFailed {
                lessons: lessons_failed,
                catalog: catalog_failed,
            }
        } else {
            LoadStatus::Ready
        };
        self.status.send_replace(status);
        status
    }

    /// Pull-to-refresh. Safe to call while another load is in flight (not serialized).
    pub async fn refresh(&self) -> LoadStatus {
        self.load_all().await
    }

    /// Load and cache the signed-in learner's profile.
    pub async fn load_profile(&self, user_id: &str) -> Result<User, DomainError> {
        let user = self.progress_service.load_user(user_id).await?;
        self.cache.write().await.profile = Some(user.clone());
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, DomainError> {
        let user = self.progress_service.update_profile(user_id, update).await?;
        self.cache_if_current(&user).await;
        Ok(user)
    }

    pub async fn record_lesson_completion(
        &self,
        user_id: &str,
        lesson_id: &str,
        xp_reward: u64,
    ) -> Result<CompletionOutcome, DomainError> {
        let outcome = self
            .progress_service
            .record_lesson_completion(user_id, lesson_id, xp_reward)
            .await?;
        if let CompletionOutcome::Recorded { user, .. } = &outcome {
            self.cache_if_current(user).await;
        }
        Ok(outcome)
    }

    pub async fn record_technique_completion(
        &self,
        user_id: &str,
        technique_id: &str,
        xp_reward: u64,
    ) -> Result<CompletionOutcome, DomainError> {
        let outcome = self
            .progress_service
            .record_technique_completion(user_id, technique_id, xp_reward)
            .await?;
        if let CompletionOutcome::Recorded { user, .. } = &outcome {
            self.cache_if_current(user).await;
        }
        Ok(outcome)
    }

    /// Replace the cached profile when it belongs to the same learner.
    async fn cache_if_current(&self, user: &User) {
        let mut cache = self.cache.write().await;
        if cache.profile.as_ref().is_some_and(|p| p.id == user.id) {
            cache.profile = Some(user.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryDocumentStore;
    use crate::domain::documents::fields_from;
    use crate::domain::{Fields, StoredDocument};
    use crate::ports::DocumentStore;
    use serde_json::json;
    use tokio::sync::Notify;

    /// Holds `list("lessons")` until the gate opens.
    struct GatedStore {
        inner: Arc<InMemoryDocumentStore>,
        gate: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl DocumentStore for GatedStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, DomainError> {
            self.inner.get(collection, id).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, DomainError> {
            if collection == "lessons" {
                self.gate.notified().await;
            }
            self.inner.list(collection).await
        }

        async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), DomainError> {
            self.inner.merge(collection, id, fields).await
        }

        async fn add(&self, collection: &str, fields: Fields) -> Result<String, DomainError> {
            self.inner.add(collection, fields).await
        }
    }

    async fn store() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .insert("lessons", "l1", fields_from(json!({"xp": 100, "title": {"en": "Rei"}})))
            .await;
        store
            .insert("techniques", "nage", fields_from(json!({"original": "Nage-waza"})))
            .await;
        store
            .insert("users", "u1", fields_from(json!({"xp": 450})))
            .await;
        store
    }

    fn learning_store(store: Arc<InMemoryDocumentStore>) -> LearningStore {
        let store: Arc<dyn DocumentStore> = store;
        LearningStore::new(
            Arc::new(CatalogService::new(Arc::clone(&store))),
            Arc::new(ProgressService::new(store)),
        )
    }

    #[tokio::test]
    async fn test_load_all_ready() {
        let state = learning_store(store().await);
        let mut rx = state.subscribe();
        assert_eq!(state.status(), LoadStatus::Idle);

        let status = state.load_all().await;
        assert_eq!(status, LoadStatus::Ready);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), LoadStatus::Ready);
        assert_eq!(state.lessons().await.len(), 1);
        assert_eq!(state.catalog().await.len(), 1);
    }

    #[tokio::test]
    async fn test_loading_until_both_fetches_settle() {
        let gate = Arc::new(Notify::new());
        let gated: Arc<dyn DocumentStore> = Arc::new(GatedStore {
            inner: store().await,
            gate: Arc::clone(&gate),
        });
        let state = Arc::new(LearningStore::new(
            Arc::new(CatalogService::new(Arc::clone(&gated))),
            Arc::new(ProgressService::new(gated)),
        ));
        let mut rx = state.subscribe();

        let task = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.load_all().await }
        });

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), LoadStatus::Loading);
        // catalog may already be done; lessons are still held
        tokio::task::yield_now().await;
        assert!(state.status().is_loading());
        assert!(state.lessons().await.is_empty());

        gate.notify_one();
        assert_eq!(task.await.unwrap(), LoadStatus::Ready);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), LoadStatus::Ready);
        assert_eq!(state.lessons().await.len(), 1);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_other() {
        let backing = store().await;
        backing.set_unreachable("lessons", true).await;
        let state = learning_store(backing.clone());

        let status = state.load_all().await;
        assert_eq!(
            status,
            LoadStatus::PartiallyFailed {
                lessons: true,
                catalog: false
            }
        );
        assert!(state.lessons().await.is_empty());
        assert_eq!(state.catalog().await.len(), 1);

        backing.set_unreachable("lessons", false).await;
        assert_eq!(state.refresh().await, LoadStatus::Ready);
        assert_eq!(state.lessons().await.len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_settle() {
        let state = learning_store(store().await);
        let (a, b) = tokio::join!(state.refresh(), state.load_all());
        assert_eq!(a, LoadStatus::Ready);
        assert_eq!(b, LoadStatus::Ready);
        assert!(!state.status().is_loading());
        assert_eq!(state.lessons().await.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_updates_cached_profile() {
        let state = learning_store(store().await);
        state.load_profile("u1").await.unwrap();

        state.record_lesson_completion("u1", "l1", 100).await.unwrap();

        let profile = state.profile().await.unwrap();
        assert_eq!(profile.xp, 550);
        assert_eq!(profile.level, 2);
        let p = state.progression().await.unwrap();
        assert_eq!(p.current_xp, 50);

        let again = state
            .record_technique_completion("u1", "seoi", 10)
            .await
            .unwrap();
        assert!(again.is_recorded());
        let dup = state
            .record_technique_completion("u1", "seoi", 10)
            .await
            .unwrap();
        assert_eq!(dup, CompletionOutcome::AlreadyCompleted);
        assert_eq!(state.profile().await.unwrap().xp, 560);
    }

    #[tokio::test]
    async fn test_missing_profile_propagates_not_found() {
        let state = learning_store(store().await);
        assert!(matches!(
            state.load_profile("ghost").await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(state.profile().await.is_none());
    }
}
