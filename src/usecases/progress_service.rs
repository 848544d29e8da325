//! Learner profile and progress recording.
//!
//! Each completion is read-modify-write against the store with a merge-write at the end.
//! There is no version token: a concurrent writer between the read and the write is
//! silently overwritten for the fields this service supplies.

use crate::domain::documents::{collections, field, user_from_document};
use crate::domain::{DomainError, Fields, ProfileUpdate, Progression, User, progression_for};
use crate::ports::DocumentStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of recording a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// XP was added and the new state persisted.
    Recorded { user: User, progression: Progression },
    /// Technique was already in the completed set; nothing written.
    AlreadyCompleted,
}

impl CompletionOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, CompletionOutcome::Recorded { .. })
    }
}

/// Which completion list a write appends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionList {
    Lessons,
    Techniques,
}

impl CompletionList {
    fn field(self) -> &'static str {
        match self {
            CompletionList::Lessons => field::COMPLETED_LESSONS,
            CompletionList::Techniques => field::COMPLETED_TECHNIQUES,
        }
    }

    fn ids(self, user: &User) -> &[String] {
        match self {
            CompletionList::Lessons => &user.completed_lessons,
            CompletionList::Techniques => &user.completed_techniques,
        }
    }
}

/// Profile/progress service. Owns every write to the `users` collection.
pub struct ProgressService {
    store: Arc<dyn DocumentStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Signup: create the profile document with zeroed progress.
    pub async fn create_user(&self, user_id: &str, name: Option<&str>) -> Result<User, DomainError> {
        let user = User {
            id: user_id.to_string(),
            name: name.map(String::from),
            belt: Default::default(),
            xp: 0,
            level: 1,
            completed_lessons: Vec::new(),
            completed_techniques: Vec::new(),
        };
        let mut fields = Fields::new();
        fields.insert(field::BELT.into(), json!(user.belt.as_str()));
        fields.insert(field::XP.into(), json!(0));
        fields.insert(field::LEVEL.into(), json!(1));
        fields.insert(field::COMPLETED_LESSONS.into(), json!([]));
        fields.insert(field::COMPLETED_TECHNIQUES.into(), json!([]));
        fields.insert(field::CREATED_AT.into(), json!(chrono::Utc::now().to_rfc3339()));
        if let Some(name) = &user.name {
            fields.insert(field::NAME.into(), Value::String(name.clone()));
        }
        self.store.merge(collections::USERS, user_id, fields).await?;
        info!(user_id, "user created");
        Ok(user)
    }

    pub async fn load_user(&self, user_id: &str) -> Result<User, DomainError> {
        let doc = self
            .store
            .get(collections::USERS, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(collections::USERS, user_id))?;
        user_from_document(&doc)
    }

    /// Merge-write only the supplied profile fields. Last write wins.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, DomainError> {
        let mut user = self.load_user(user_id).await?;
        let mut fields = Fields::new();
        if let Some(name) = &update.name {
            fields.insert(field::NAME.into(), Value::String(name.clone()));
            user.name = Some(name.clone());
        }
        if let Some(belt) = update.belt {
            fields.insert(field::BELT.into(), json!(belt.as_str()));
            user.belt = belt;
        }
        if fields.is_empty() {
            return Ok(user);
        }
        self.store.merge(collections::USERS, user_id, fields).await?;
        info!(user_id, belt = %user.belt, "profile updated");
        Ok(user)
    }

    /// Append `lesson_id` and add its XP. Not idempotent: repeating a lesson adds XP
    /// again and appends a duplicate id.
    pub async fn record_lesson_completion(
        &self,
        user_id: &str,
        lesson_id: &str,
        xp_reward: u64,
    ) -> Result<CompletionOutcome, DomainError> {
        let mut user = self.load_user(user_id).await?;
        user.completed_lessons.push(lesson_id.to_string());
        let progression = self
            .persist_progress(&mut user, xp_reward, CompletionList::Lessons)
            .await?;
        info!(user_id, lesson_id, xp = user.xp, level = user.level, "lesson completed");
        Ok(CompletionOutcome::Recorded { user, progression })
    }

    /// Append `technique_id` and add its XP, unless it is already completed
    /// (then a warning is logged and nothing is written).
    pub async fn record_technique_completion(
        &self,
        user_id: &str,
        technique_id: &str,
        xp_reward: u64,
    ) -> Result<CompletionOutcome, DomainError> {
        let mut user = self.load_user(user_id).await?;
        if user.completed_techniques.iter().any(|t| t == technique_id) {
            warn!(user_id, technique_id, "technique already completed; no XP awarded");
            return Ok(CompletionOutcome::AlreadyCompleted);
        }
        user.completed_techniques.push(technique_id.to_string());
        let progression = self
            .persist_progress(&mut user, xp_reward, CompletionList::Techniques)
            .await?;
        info!(user_id, technique_id, xp = user.xp, level = user.level, "technique completed");
        Ok(CompletionOutcome::Recorded { user, progression })
    }

    /// Add XP, derive the level and merge-write xp, level and the given completion list.
    async fn persist_progress(
        &self,
        user: &mut User,
        xp_reward: u64,
        list: CompletionList,
    ) -> Result<Progression, DomainError> {
        user.xp = user.xp.saturating_add(xp_reward);
        let progression = progression_for(user.xp);
        user.level = progression.level;
        let mut fields = Fields::new();
        fields.insert(field::XP.into(), json!(user.xp));
        fields.insert(field::LEVEL.into(), json!(user.level));
        fields.insert(list.field().into(), json!(list.ids(user)));
        self.store.merge(collections::USERS, &user.id, fields).await?;
        Ok(progression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryDocumentStore;
    use crate::domain::BeltRank;
    use crate::domain::documents::fields_from;

    async fn store_with_user(xp: u64) -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .insert(
                "users",
                "u1",
                fields_from(json!({"name": "Kano", "xp": xp, "city": "Tokyo"})),
            )
            .await;
        store
    }

    #[tokio::test]
    async fn test_lesson_completion_levels_up() {
        let store = store_with_user(450).await;
        let service = ProgressService::new(store.clone());

        let outcome = service.record_lesson_completion("u1", "l1", 100).await.unwrap();
        let CompletionOutcome::Recorded { user, progression } = outcome else {
            panic!("expected recorded");
        };
        assert_eq!(user.xp, 550);
        assert_eq!(progression.level, 2);
        assert_eq!(progression.current_xp, 50);
        assert_eq!(progression.required_xp, 600);
        assert!((progression.percent - 8.33).abs() < 0.01);

        let stored = store.snapshot("users", "u1").await.unwrap();
        assert_eq!(stored["xp"], json!(550));
        assert_eq!(stored["level"], json!(2));
        assert_eq!(stored["completedLessons"], json!(["l1"]));
        // merge-write leaves other fields untouched
        assert_eq!(stored["city"], json!("Tokyo"));
    }

    #[tokio::test]
    async fn test_lesson_completion_is_not_idempotent() {
        let store = store_with_user(0).await;
        let service = ProgressService::new(store.clone());

        service.record_lesson_completion("u1", "l1", 100).await.unwrap();
        service.record_lesson_completion("u1", "l1", 100).await.unwrap();

        let user = service.load_user("u1").await.unwrap();
        assert_eq!(user.xp, 200);
        assert_eq!(user.completed_lessons, vec!["l1", "l1"]);
        assert_eq!(store.write_count().await, 2);
    }

    #[tokio::test]
    async fn test_technique_completion_is_idempotent() {
        let store = store_with_user(0).await;
        let service = ProgressService::new(store.clone());

        let first = service
            .record_technique_completion("u1", "seoi", 150)
            .await
            .unwrap();
        assert!(first.is_recorded());
        let second = service
            .record_technique_completion("u1", "seoi", 150)
            .await
            .unwrap();
        assert_eq!(second, CompletionOutcome::AlreadyCompleted);

        let user = service.load_user("u1").await.unwrap();
        assert_eq!(user.xp, 150);
        assert_eq!(user.completed_techniques, vec!["seoi"]);
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_completion_writes_only_its_own_list() {
        let store = store_with_user(0).await;
        store
            .insert(
                "users",
                "u1",
                fields_from(json!({"xp": 0, "completedLessons": ["l0"], "completedTechniques": ["o-goshi"]})),
            )
            .await;
        let service = ProgressService::new(store.clone());

        service.record_technique_completion("u1", "seoi", 10).await.unwrap();
        let stored = store.snapshot("users", "u1").await.unwrap();
        assert_eq!(stored["completedTechniques"], json!(["o-goshi", "seoi"]));
        assert_eq!(stored["completedLessons"], json!(["l0"]));

        service.record_lesson_completion("u1", "l1", 10).await.unwrap();
        let stored = store.snapshot("users", "u1").await.unwrap();
        assert_eq!(stored["completedLessons"], json!(["l0", "l1"]));
        assert_eq!(stored["completedTechniques"], json!(["o-goshi", "seoi"]));
        assert_eq!(stored["xp"], json!(20));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found_without_write() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let service = ProgressService::new(store.clone());

        let err = service
            .record_lesson_completion("ghost", "l1", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { ref id, .. } if id == "ghost"));

        let err = service
            .record_technique_completion("ghost", "seoi", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let store = store_with_user(0).await;
        let service = ProgressService::new(store.clone());
        store.set_unreachable("users", true).await;
        let err = service
            .record_lesson_completion("u1", "l1", 100)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_create_and_update_profile() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let service = ProgressService::new(store.clone());

        let created = service.create_user("u2", Some("Mifune")).await.unwrap();
        assert_eq!(created.level, 1);
        let stored = store.snapshot("users", "u2").await.unwrap();
        assert_eq!(stored["belt"], json!("white"));
        assert!(stored.contains_key("createdAt"));

        let updated = service
            .update_profile(
                "u2",
                &ProfileUpdate {
                    name: None,
                    belt: Some(BeltRank::RedAndWhite),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.belt, BeltRank::RedAndWhite);
        assert_eq!(updated.name.as_deref(), Some("Mifune"));

        let reloaded = service.load_user("u2").await.unwrap();
        assert_eq!(reloaded.belt, BeltRank::RedAndWhite);

        assert!(matches!(
            service.update_profile("ghost", &ProfileUpdate::default()).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
