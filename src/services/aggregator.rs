//! Stream aggregation for one episode.
//!
//! A request fans out to two sources at once: the pre-built dataset index
//! and live extraction from the source's player pages. Either side degrades
//! to an empty list on failure, so a broken scrape never hides dataset
//! streams and vice versa. The merged, deduplicated list is cached before
//! language filtering; a cached episode can serve any language preference.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::clients::{DatasetIndex, SourceClient};
use crate::models::episode::MediaId;
use crate::models::season::SeasonDescriptor;
use crate::models::stream::{
    StreamCandidate, StreamSource, dedupe_by_url, filter_by_language, order_by_language,
};
use crate::parser::source_page;
use crate::services::cache::CacheService;
use crate::services::metadata::MetadataService;
use crate::services::rate_limit::RateLimiter;
use crate::services::resolver::SeasonAddressResolver;

pub struct StreamAggregator {
    cache: Arc<CacheService>,
    source: Arc<SourceClient>,
    limiter: Arc<RateLimiter>,
    dataset: Arc<DatasetIndex>,
    resolver: Arc<SeasonAddressResolver>,
    metadata: Arc<MetadataService>,
    excluded_domains: Vec<String>,
}

impl StreamAggregator {
    #[must_use]
    pub fn new(
        cache: Arc<CacheService>,
        source: Arc<SourceClient>,
        limiter: Arc<RateLimiter>,
        dataset: Arc<DatasetIndex>,
        resolver: Arc<SeasonAddressResolver>,
        metadata: Arc<MetadataService>,
        excluded_domains: Vec<String>,
    ) -> Self {
        Self {
            cache,
            source,
            limiter,
            dataset,
            resolver,
            metadata,
            excluded_domains,
        }
    }

    /// Every known stream for the episode, deduplicated and ordered. Never
    /// fails: any upstream problem shrinks the list, possibly to empty.
    pub async fn resolve_streams(
        &self,
        id: &MediaId,
        language_filter: Option<&str>,
        order: &str,
        client: &str,
    ) -> Vec<StreamCandidate> {
        let cache_key = id.to_string();

        match self.cache.get::<Vec<StreamCandidate>>(&cache_key).await {
            Ok(Some(cached)) => {
                debug!(id = %id, count = cached.len(), "Streams served from cache");
                return self.finalize(cached, language_filter, order);
            }
            Ok(None) => {}
            Err(e) => warn!(id = %id, error = %e, "Stream cache read failed, refetching"),
        }

        let descriptor = self.season_descriptor(id).await;

        let dataset_task = async { self.dataset.lookup(&id.slug, id.season, id.episode, None) };
        let live_task = async {
            match &descriptor {
                Some(descriptor) => self.extract_live(id, descriptor, client).await,
                None => Vec::new(),
            }
        };
        let (from_dataset, from_live) = tokio::join!(dataset_task, live_task);

        let mut merged = from_dataset;
        merged.extend(from_live);
        let merged = dedupe_by_url(merged);

        info!(id = %id, count = merged.len(), "Streams aggregated");

        if let Err(e) = self.cache.set(&cache_key, &merged, None).await {
            warn!(id = %id, error = %e, "Stream cache write failed");
        }

        self.finalize(merged, language_filter, order)
    }

    async fn season_descriptor(&self, id: &MediaId) -> Option<SeasonDescriptor> {
        let details = match self.metadata.resolve_details(&id.slug).await {
            Ok(details) => details?,
            Err(e) => {
                warn!(slug = %id.slug, error = %e, "Details lookup failed during aggregation");
                return None;
            }
        };

        details
            .seasons
            .into_iter()
            .find(|s| s.kind.as_number() == id.season)
    }

    /// Live extraction: per published language, resolve the physical page
    /// holding the episode, pull its player links, and chase each player
    /// down to a media URL. Languages run sequentially behind the rate
    /// limiter; players within one language run concurrently.
    async fn extract_live(
        &self,
        id: &MediaId,
        descriptor: &SeasonDescriptor,
        client: &str,
    ) -> Vec<StreamCandidate> {
        let mut candidates = Vec::new();

        for language in &descriptor.languages {
            self.limiter.wait(client).await;

            let Some(address) = self
                .resolver
                .resolve_address(&id.slug, descriptor, id.episode as usize, language)
                .await
            else {
                continue;
            };

            let script = match self
                .source
                .episodes_script(&id.slug, &address.path, &address.language)
                .await
            {
                Ok(script) => script,
                Err(e) => {
                    debug!(id = %id, language, error = %e, "Episode script fetch failed");
                    continue;
                }
            };

            let players = source_page::player_links_at(&script, address.position);
            if players.is_empty() {
                debug!(id = %id, language, "No player links at resolved position");
                continue;
            }

            let extractions = players
                .iter()
                .map(|player| self.extract_media_url(player, language));
            candidates.extend(join_all(extractions).await.into_iter().flatten());
        }

        candidates
    }

    /// Resolves one player page to a direct media URL. Sibnet hides the
    /// real URL behind a redirect on the player's source attribute; every
    /// other host embeds a foreign-host video URL in the page body.
    async fn extract_media_url(&self, player_url: &str, language: &str) -> Option<StreamCandidate> {
        let host = source_page::host_of(player_url)?;

        let url = if host.contains("sibnet") {
            self.resolve_sibnet(player_url).await?
        } else {
            let html = match self.source.player_page(player_url).await {
                Ok(html) => html,
                Err(e) => {
                    debug!(player_url, error = %e, "Player page fetch failed");
                    return None;
                }
            };
            source_page::first_video_url(&html, host)?
        };

        Some(StreamCandidate {
            url,
            language: language.to_string(),
            source: StreamSource::Live,
        })
    }

    async fn resolve_sibnet(&self, player_url: &str) -> Option<String> {
        let html = match self.source.player_page(player_url).await {
            Ok(html) => html,
            Err(e) => {
                debug!(player_url, error = %e, "Sibnet player fetch failed");
                return None;
            }
        };

        let src = source_page::sibnet_player_src(&html)?;

        match self.source.http().redirect_target(&src, player_url).await {
            Ok(Some(target)) => Some(target),
            Ok(None) => Some(src),
            Err(e) => {
                debug!(player_url, error = %e, "Sibnet redirect resolution failed");
                None
            }
        }
    }

    fn finalize(
        &self,
        candidates: Vec<StreamCandidate>,
        language_filter: Option<&str>,
        order: &str,
    ) -> Vec<StreamCandidate> {
        let kept = drop_excluded(candidates, &self.excluded_domains);
        match language_filter {
            Some(filter) => filter_by_language(kept, Some(filter)),
            None => order_by_language(kept, order),
        }
    }
}

/// Removes candidates whose host matches one of the excluded domains.
#[must_use]
fn drop_excluded(candidates: Vec<StreamCandidate>, excluded: &[String]) -> Vec<StreamCandidate> {
    if excluded.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| {
            source_page::host_of(&c.url)
                .is_none_or(|host| !excluded.iter().any(|domain| host.contains(domain.as_str())))
        })
        .collect()
}
