//! Wiring & DI. Entry point: pick a document store, inject it into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use judo_sync::adapters::firestore::FirestoreRestStore;
use judo_sync::adapters::persistence::{
    InMemoryDocumentStore, SqliteDocumentStore, import_seed_file,
};
use judo_sync::adapters::ui::tui::TuiInputPort;
use judo_sync::ports::{DocumentStore, InputPort};
use judo_sync::shared::config::{AppConfig, Backend};
use judo_sync::usecases::{
    CatalogService, DojoService, LeaderboardService, LearningStore, ProgressService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    judo_sync::adapters::ui::init_ui();

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    let data_path = PathBuf::from(cfg.data_dir_or_default());

    // --- Document store ---
    let store: Arc<dyn DocumentStore> = match cfg.backend_or_default() {
        Backend::Firestore => {
            let project = cfg
                .firestore_project_id
                .clone()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Set JUDO_FIRESTORE_PROJECT_ID for the firestore backend"))?;
            let database = cfg.firestore_database_or_default();
            info!(project = %project, database = %database, "using Firestore backend");
            let store = match &cfg.firestore_url {
                Some(url) => FirestoreRestStore::with_base_url(
                    url,
                    &project,
                    &database,
                    cfg.firestore_api_key.clone(),
                    cfg.firestore_id_token.clone(),
                ),
                None => FirestoreRestStore::new(
                    &project,
                    &database,
                    cfg.firestore_api_key.clone(),
                    cfg.firestore_id_token.clone(),
                ),
            };
            Arc::new(store)
        }
        Backend::Sqlite => Arc::new(
            SqliteDocumentStore::connect(&data_path)
                .await
                .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
        ),
        Backend::Memory => {
            info!("using in-memory backend; nothing is persisted");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    if let Some(seed) = &cfg.seed_file {
        import_seed_file(store.as_ref(), seed)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    // --- Services ---
    let catalog = Arc::new(CatalogService::new(Arc::clone(&store)));
    let progress = Arc::new(ProgressService::new(Arc::clone(&store)));
    let learning = Arc::new(LearningStore::new(Arc::clone(&catalog), progress));
    let leaderboard = Arc::new(LeaderboardService::new(Arc::clone(&store)));
    let dojos = Arc::new(DojoService::new(Arc::clone(&store)));

    if cfg.user_id.is_none() {
        warn!("JUDO_USER_ID not set; browsing only, progress cannot be recorded");
    }

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        learning,
        catalog,
        leaderboard,
        dojos,
        cfg.user_id.clone(),
        cfg.language_or_default(),
        cfg.leaderboard_size_or_default(),
        data_path.join("exports"),
    ));

    // --- Run (main menu -> profile / techniques / lessons / leaderboard / dojos) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
