//! Application use cases. Orchestrate domain logic via ports.

pub mod catalog_service;
pub mod dojo_service;
pub mod leaderboard_service;
pub mod learning_store;
pub mod progress_service;

pub use catalog_service::{CatalogService, find_technique};
pub use dojo_service::DojoService;
pub use leaderboard_service::{LeaderboardEntry, LeaderboardService};
pub use learning_store::{LearningStore, LoadStatus};
pub use progress_service::{CompletionOutcome, ProgressService};
