//! Key/value cache over the SQLite store with a context-aware TTL policy.
//!
//! Keys are plain strings with a namespace-identifying prefix (`as:` for
//! source-site data, `tmdb:` for foreign-catalog data). The prefix convention
//! is the persisted wire format of the cache; it must stay stable across
//! restarts.

use std::sync::{Arc, LazyLock, OnceLock};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::constants::cache_keys;
use crate::db::Store;

static EPISODE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"s\d+e\d+").expect("valid regex"));

/// Answers "is this anime still in the source's publication schedule?" for
/// the dynamic TTL branch. Implemented by the schedule service; wired in
/// after construction because the schedule service caches through this very
/// cache (with an explicit TTL, so there is no recursion at runtime).
#[async_trait::async_trait]
pub trait OngoingProbe: Send + Sync {
    async fn is_ongoing(&self, slug: &str) -> bool;
}

pub struct CacheService {
    store: Arc<Store>,
    config: CacheConfig,
    schedule: OnceLock<Arc<dyn OngoingProbe>>,
}

impl CacheService {
    #[must_use]
    pub fn new(store: Arc<Store>, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            schedule: OnceLock::new(),
        }
    }

    /// Wires in the schedule probe used by the dynamic TTL branch. May only
    /// be called once, during state construction.
    pub fn attach_schedule(&self, schedule: Arc<dyn OngoingProbe>) {
        if self.schedule.set(schedule).is_err() {
            warn!("Schedule probe already attached to cache service");
        }
    }

    /// Reads and deserializes a cached value. An undecodable payload is
    /// treated as a miss and evicted.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let now = Utc::now().timestamp();
        let Some(entry) = self.store.cache_get(key, now).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&entry.payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Evicting undecodable cache payload");
                self.store.cache_delete(key).await?;
                Ok(None)
            }
        }
    }

    /// Serializes and stores a value. With `ttl = None` the TTL is chosen
    /// from the key's shape by [`Self::ttl_for_key`].
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let ttl = match ttl {
            Some(ttl) => ttl,
            None => self.ttl_for_key(key).await,
        };

        let now = Utc::now().timestamp();
        let expires_at = now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        let payload = serde_json::to_string(value)?;

        debug!(key, ttl_secs = ttl.as_secs(), "Caching entry");
        self.store
            .cache_set(key, namespace_of(key), payload, now, expires_at)
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.cache_delete(key).await
    }

    /// Context-aware TTL selection:
    /// foreign-catalog keys get a long fixed TTL, the schedule key and
    /// listing keys a medium one, episode-stream keys a short one, and a
    /// bare per-anime key a dynamic TTL depending on whether the anime is
    /// still in the publication schedule.
    pub async fn ttl_for_key(&self, key: &str) -> Duration {
        if key.starts_with(cache_keys::FOREIGN_PREFIX) {
            return Duration::from_secs(self.config.foreign_catalog_ttl);
        }

        if key == cache_keys::SCHEDULE_KEY {
            return Duration::from_secs(self.config.schedule_ttl);
        }

        if key.contains(":players") || EPISODE_MARKER.is_match(key) {
            return Duration::from_secs(self.config.episode_ttl);
        }

        if cache_keys::LISTING_MARKERS.iter().any(|m| key.contains(m)) {
            return Duration::from_secs(self.config.dynamic_lists_ttl);
        }

        if let Some(slug) = key.strip_prefix(cache_keys::SOURCE_PREFIX)
            && !slug.is_empty()
            && !slug.contains(':')
        {
            let ongoing = match self.schedule.get() {
                Some(schedule) => schedule.is_ongoing(slug).await,
                // Before the probe is wired in, assume ongoing: the short
                // TTL is the safe direction.
                None => true,
            };
            return if ongoing {
                Duration::from_secs(self.config.ongoing_ttl)
            } else {
                Duration::from_secs(self.config.finished_ttl)
            };
        }

        Duration::from_secs(self.config.dynamic_lists_ttl)
    }
}

fn namespace_of(key: &str) -> &'static str {
    if key.starts_with(cache_keys::FOREIGN_PREFIX) {
        "tmdb"
    } else {
        "source"
    }
}
