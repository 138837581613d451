use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CHUNK_WORD_THRESHOLD: usize = 1000;
const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the search sync server and CLI.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Search backend receiving documents.
    pub search_provider: SearchProviderKind,
    /// Algolia credentials, present when `search_provider` is `algolia`.
    pub algolia: Option<AlgoliaCredentials>,
    /// Upper bound for every provider HTTP call, in seconds.
    pub provider_timeout_secs: u64,
    /// Word count above which content bodies are split into chunks.
    pub chunk_word_threshold: usize,
    /// Public site URL used for canonical links and index-name derivation.
    pub site_url: String,
    /// JSON file holding the configured index definitions.
    pub index_definitions_path: PathBuf,
    /// Optional directory of JSON content snapshots served by the in-memory store.
    pub content_dir: Option<PathBuf>,
    /// Content types indexable when an index definition lists none.
    pub indexable_content_types: Vec<String>,
    /// Statuses allowed into the index.
    pub indexable_statuses: Vec<String>,
    /// Batch size used when a batch-job caller omits one.
    pub default_batch_size: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported search backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    /// Hosted Algolia index.
    Algolia,
    /// Process-local index, useful for development and tests.
    Memory,
}

/// Credentials for the Algolia REST API.
#[derive(Clone, Deserialize)]
pub struct AlgoliaCredentials {
    /// Application identifier.
    pub app_id: String,
    /// Admin (write) API key.
    pub admin_api_key: String,
    /// Search-only key handed to front-ends.
    pub search_api_key: Option<String>,
    /// Optional host override; defaults to `https://{app_id}.algolia.net`.
    pub base_url: Option<String>,
}

impl fmt::Debug for AlgoliaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgoliaCredentials")
            .field("app_id", &self.app_id)
            .field("admin_api_key", &"<redacted>")
            .field(
                "search_api_key",
                &self.search_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let search_provider: SearchProviderKind = load_env("SEARCH_PROVIDER")?
            .parse()
            .map_err(|()| ConfigError::InvalidValue("SEARCH_PROVIDER".to_string()))?;

        let algolia = match search_provider {
            SearchProviderKind::Algolia => Some(AlgoliaCredentials {
                app_id: load_env("ALGOLIA_APP_ID")?,
                admin_api_key: load_env("ALGOLIA_ADMIN_API_KEY")?,
                search_api_key: load_env_optional("ALGOLIA_SEARCH_API_KEY"),
                base_url: load_env_optional("ALGOLIA_BASE_URL"),
            }),
            SearchProviderKind::Memory => None,
        };

        Ok(Self {
            search_provider,
            algolia,
            provider_timeout_secs: parse_optional("PROVIDER_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
            chunk_word_threshold: parse_optional("CHUNK_WORD_THRESHOLD")?
                .unwrap_or(DEFAULT_CHUNK_WORD_THRESHOLD),
            site_url: load_env("SITE_URL")?,
            index_definitions_path: load_env_optional("INDEX_DEFINITIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("indexes.json")),
            content_dir: load_env_optional("CONTENT_DIR").map(PathBuf::from),
            indexable_content_types: load_env_optional("INDEXABLE_CONTENT_TYPES")
                .map(|value| split_list(&value))
                .unwrap_or_else(|| vec!["post".into(), "page".into()]),
            indexable_statuses: load_env_optional("INDEXABLE_STATUSES")
                .map(|value| split_list(&value))
                .unwrap_or_else(|| vec!["publish".into()]),
            default_batch_size: parse_optional("DEFAULT_BATCH_SIZE")?
                .unwrap_or(DEFAULT_BATCH_SIZE),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

impl std::str::FromStr for SearchProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "algolia" => Ok(Self::Algolia),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        provider = ?config.search_provider,
        has_admin_key = config
            .algolia
            .as_ref()
            .map(|credentials| !credentials.admin_api_key.is_empty())
            .unwrap_or(false),
        site_url = %config.site_url,
        chunk_word_threshold = config.chunk_word_threshold,
        timeout_secs = config.provider_timeout_secs,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
