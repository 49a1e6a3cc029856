use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Page size for the startup reconciliation scan of the search index.
pub const SEARCH_PAGE_SIZE: usize = 100;
/// How long a change-feed long-poll request is held open server-side.
pub const FEED_POLL_TIMEOUT_SECS: u64 = 25;
/// Delay before retrying a failed change-feed poll.
pub const FEED_RETRY_SECS: u64 = 5;

/// Top-level config (tempo.toml + TEMPO_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    /// Collapses every cadence to near-immediate firing so integration
    /// tests finish in seconds. Never enable in production: one-shot
    /// schedules are deleted right after their accelerated fire.
    #[serde(default)]
    pub test_mode: bool,
}

/// Durable object store endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Search index endpoint. Falls back to the store endpoint when unset.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchConfig {
    pub base_url: Option<String>,
}

/// Change-feed endpoint. Falls back to the store endpoint when unset.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeedConfig {
    pub base_url: Option<String>,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            search: SearchConfig::default(),
            feed: FeedConfig::default(),
            test_mode: false,
        }
    }
}

impl TempoConfig {
    /// Load config from a TOML file with TEMPO_* env var overrides.
    ///
    /// Checks the explicit path argument first, then ~/.tempo/tempo.toml.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: TempoConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("TEMPO_").split("_"))
            .extract()
            .map_err(|e| crate::error::TempoError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Base URL the search index lives on.
    pub fn search_base_url(&self) -> &str {
        self.search
            .base_url
            .as_deref()
            .unwrap_or(&self.store.base_url)
    }

    /// Base URL the change feed lives on.
    pub fn feed_base_url(&self) -> &str {
        self.feed
            .base_url
            .as_deref()
            .unwrap_or(&self.store.base_url)
    }
}

fn default_store_url() -> String {
    "http://localhost:8410".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_poll_timeout_secs() -> u64 {
    FEED_POLL_TIMEOUT_SECS
}
fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.tempo/tempo.toml", home)
}
