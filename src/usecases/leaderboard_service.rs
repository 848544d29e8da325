//! Leaderboard: learners ranked by XP.

use crate::domain::documents::{collections, user_from_document};
use crate::domain::{BeltRank, DomainError};
use crate::ports::DocumentStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// One row of the leaderboard. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub belt: BeltRank,
    pub xp: u64,
    pub level: u32,
}

pub struct LeaderboardService {
    store: Arc<dyn DocumentStore>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Top `limit` learners by XP (ties: displayed name, then id).
    pub async fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, DomainError> {
        let docs = self.store.list(collections::USERS).await?;
        let mut entries: Vec<_> = docs
            .iter()
            .filter_map(|d| match user_from_document(d) {
                Ok(u) => Some(LeaderboardEntry {
                    rank: 0,
                    name: u.name.unwrap_or_else(|| u.id.clone()),
                    user_id: u.id,
                    belt: u.belt,
                    xp: u.xp,
                    level: u.level,
                }),
                Err(e) => {
                    warn!(id = %d.id, error = %e, "skipping malformed user");
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.xp.cmp(&a.xp)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries.truncate(limit);
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        Ok(entries)
    }

    /// Same as `top`, but a failed fetch is logged and shown as an empty board.
    pub async fn top_or_empty(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.top(limit).await.unwrap_or_else(|e| {
            warn!(error = %e, "leaderboard unavailable");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryDocumentStore;
    use crate::domain::documents::fields_from;
    use serde_json::json;

    #[tokio::test]
    async fn test_ranks_by_xp() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert("users", "a", fields_from(json!({"name": "Abe", "xp": 600}))).await;
        store.insert("users", "b", fields_from(json!({"name": "Ban", "xp": 12_500}))).await;
        store.insert("users", "zen", fields_from(json!({"xp": 600}))).await;
        store.insert("users", "d", fields_from(json!({"name": "Dan", "xp": 10}))).await;
        let service = LeaderboardService::new(store);

        let board = service.top(3).await.unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].user_id, "b");
        assert_eq!(board[0].level, 20);
        // ties order by the name shown, which is the id for unnamed learners
        assert_eq!(board[1].user_id, "a");
        assert_eq!(board[2].user_id, "zen");
        assert_eq!(board[2].name, "zen");
        assert_eq!(board.iter().map(|e| e.rank).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unnamed_learner_ties_on_id() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert("users", "u9", fields_from(json!({"name": "Mifune", "xp": 300}))).await;
        store.insert("users", "aoki", fields_from(json!({"xp": 300}))).await;
        let board = LeaderboardService::new(store).top(10).await.unwrap();
        assert_eq!(
            board.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            ["Mifune", "aoki"]
        );
    }

    #[tokio::test]
    async fn test_unavailable_board_degrades_to_empty() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.set_unreachable("users", true).await;
        let service = LeaderboardService::new(store);
        assert!(service.top(10).await.is_err());
        assert!(service.top_or_empty(10).await.is_empty());
    }
}
