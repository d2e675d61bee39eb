//! Publication schedule lookups.
//!
//! The source lists currently-airing anime on a single planning page. The
//! slug set is cached under the schedule key with its fixed TTL; everything
//! here degrades to "empty set" on fetch failure, which reads as "nothing
//! ongoing" downstream.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::SourceClient;
use crate::constants::cache_keys;
use crate::parser::source_page;
use crate::services::cache::{CacheService, OngoingProbe};

pub struct ScheduleService {
    cache: Arc<CacheService>,
    source: Arc<SourceClient>,
}

impl ScheduleService {
    #[must_use]
    pub fn new(cache: Arc<CacheService>, source: Arc<SourceClient>) -> Self {
        Self { cache, source }
    }

    /// Slugs of every anime currently in the schedule, cached.
    pub async fn current_slugs(&self) -> Vec<String> {
        match self.cache.get::<Vec<String>>(cache_keys::SCHEDULE_KEY).await {
            Ok(Some(slugs)) => return slugs,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Schedule cache read failed, refetching"),
        }

        let html = match self.source.schedule_page().await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Schedule page fetch failed");
                return Vec::new();
            }
        };

        let slugs = source_page::schedule_slugs(&html);
        info!(count = slugs.len(), "Publication schedule refreshed");

        if let Err(e) = self
            .cache
            .set(cache_keys::SCHEDULE_KEY, &slugs, None)
            .await
        {
            warn!(error = %e, "Schedule cache write failed");
        }

        slugs
    }
}

#[async_trait::async_trait]
impl OngoingProbe for ScheduleService {
    /// Prefix matching on both sides: the schedule sometimes lists a
    /// season-specific slug for an anime cached under its bare slug.
    async fn is_ongoing(&self, slug: &str) -> bool {
        self.current_slugs()
            .await
            .iter()
            .any(|s| s == slug || s.starts_with(slug) || slug.starts_with(s.as_str()))
    }
}
