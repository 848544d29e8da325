//! Application configuration. Store backend, credentials, paths.

use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
pub const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";

/// Which DocumentStore implementation backs the app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hosted Firestore over REST.
    Firestore,
    /// Local libsql mirror in `data_dir`.
    #[default]
    Sqlite,
    /// Process memory; nothing survives exit.
    Memory,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Read from JUDO_BACKEND (firestore | sqlite | memory).
    #[serde(default)]
    pub backend: Option<Backend>,
    pub data_dir: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Firestore
    // ─────────────────────────────────────────────────────────────────────────
    /// Read from JUDO_FIRESTORE_PROJECT_ID.
    #[serde(default)]
    pub firestore_project_id: Option<String>,

    /// Database id. Defaults to "(default)".
    #[serde(default)]
    pub firestore_database: Option<String>,

    /// Web API key, appended as `?key=`. Read from JUDO_FIRESTORE_API_KEY.
    #[serde(default)]
    pub firestore_api_key: Option<String>,

    /// Firebase Auth ID token sent as bearer. Read from JUDO_FIRESTORE_ID_TOKEN.
    #[serde(default)]
    pub firestore_id_token: Option<String>,

    /// Overrides the REST endpoint (emulator). Read from JUDO_FIRESTORE_URL.
    #[serde(default)]
    pub firestore_url: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────
    /// Signed-in learner. Read from JUDO_USER_ID.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Language for localized titles. Defaults to "en".
    #[serde(default)]
    pub language: Option<String>,

    /// Kept as text; an unparsable or zero value falls back to the default.
    #[serde(default)]
    pub leaderboard_size: Option<String>,

    /// JSON fixture merged into the store at startup. Read from JUDO_SEED_FILE.
    #[serde(default)]
    pub seed_file: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        Self::from_env(None)
    }

    /// Builds from `JUDO_*` variables. `vars` replaces the process environment when given.
    pub fn from_env(vars: Option<HashMap<String, String>>) -> Result<Self, config::ConfigError> {
        let config_file = match &vars {
            Some(map) => map.get("JUDO_CONFIG").cloned(),
            None => std::env::var("JUDO_CONFIG").ok(),
        };
        let mut c = config::Config::builder()
            .add_source(config::Environment::with_prefix("JUDO").source(vars));
        if let Some(path) = config_file {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Returns the selected backend. Firestore when a project is configured and nothing was chosen.
    pub fn backend_or_default(&self) -> Backend {
        match self.backend {
            Some(b) => b,
            None if self.is_firestore_configured() => Backend::Firestore,
            None => Backend::default(),
        }
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    pub fn firestore_database_or_default(&self) -> String {
        self.firestore_database
            .clone()
            .unwrap_or_else(|| DEFAULT_FIRESTORE_DATABASE.to_string())
    }

    pub fn language_or_default(&self) -> String {
        self.language.clone().unwrap_or_else(|| "en".to_string())
    }

    pub fn leaderboard_size_or_default(&self) -> usize {
        self.leaderboard_size
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
    }

    /// Returns true if a Firestore project id is present.
    pub fn is_firestore_configured(&self) -> bool {
        self.firestore_project_id
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}
