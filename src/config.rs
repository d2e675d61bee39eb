use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub source: SourceConfig,

    pub cache: CacheConfig,

    pub tmdb: TmdbConfig,

    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/anistream.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7654,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,

    /// Minimum spacing between outbound source fetches per client, in
    /// milliseconds. Spacing is per worker process, not global.
    pub rate_limit_ms: u64,

    /// Request timeout in seconds (default: 15)
    pub request_timeout_seconds: u64,

    /// Retry attempts on 5xx or timeout (default: 2)
    pub retry_attempts: u32,

    /// Linear backoff step between retries, in milliseconds.
    pub retry_backoff_ms: u64,

    /// Stream URLs whose host matches one of these patterns are dropped
    /// from aggregation results.
    pub excluded_domains: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://anime-sama.fr".to_string(),
            rate_limit_ms: 500,
            request_timeout_seconds: 15,
            retry_attempts: 2,
            retry_backoff_ms: 1000,
            excluded_domains: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for episode-stream entries, in seconds (default: 1h).
    pub episode_ttl: u64,

    /// TTL for catalog/search/genre/homepage/filter listings (default: 1h).
    pub dynamic_lists_ttl: u64,

    /// TTL for the publication schedule entry (default: 1h).
    pub schedule_ttl: u64,

    /// TTL for metadata of an anime still in the schedule (default: 1h).
    pub ongoing_ttl: u64,

    /// TTL for metadata of a finished anime (default: 7d).
    pub finished_ttl: u64,

    /// TTL for foreign-catalog entries (default: 7d).
    pub foreign_catalog_ttl: u64,

    /// How long an acquired scrape lock stays valid, in seconds.
    pub lock_ttl: u64,

    /// How long a caller waits for a contended lock before giving up.
    pub lock_wait_timeout: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            episode_ttl: 3600,
            dynamic_lists_ttl: 3600,
            schedule_ttl: 3600,
            ongoing_ttl: 3600,
            finished_ttl: 604_800,
            foreign_catalog_ttl: 604_800,
            lock_ttl: 300,
            lock_wait_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub enabled: bool,

    pub api_key: String,

    pub base_url: String,

    pub image_base_url: String,

    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
            language: "fr-FR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub enabled: bool,

    /// Local path of the pre-built stream index.
    pub path: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "data/dataset.json".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            source: SourceConfig::default(),
            cache: CacheConfig::default(),
            tmdb: TmdbConfig::default(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("TMDB_API_KEY")
            && !key.is_empty()
        {
            self.tmdb.api_key = key;
            self.tmdb.enabled = true;
        }
        if let Ok(url) = std::env::var("SOURCE_BASE_URL")
            && !url.is_empty()
        {
            self.source.base_url = url;
        }
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Ok(custom) = std::env::var("ANISTREAM_CONFIG") {
            paths.insert(0, PathBuf::from(custom));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.is_empty() {
            anyhow::bail!("Source base URL cannot be empty");
        }
        url::Url::parse(&self.source.base_url).context("Invalid source base URL")?;

        if self.tmdb.enabled && self.tmdb.api_key.is_empty() {
            anyhow::bail!("TMDB API key cannot be empty when TMDB is enabled");
        }

        if self.cache.lock_ttl == 0 || self.cache.lock_wait_timeout == 0 {
            anyhow::bail!("Lock TTL and wait timeout must be > 0");
        }

        Ok(())
    }
}
