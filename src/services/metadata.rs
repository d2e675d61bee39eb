//! Per-anime metadata assembly.
//!
//! The catalogue fetch is the one expensive operation worth single-flight
//! protection: concurrent requests for the same slug would all scrape the
//! same pages. The lock is best-effort; when it cannot be acquired within
//! the wait window the fetch proceeds unlocked and the double-checked cache
//! absorbs most of the duplicate work.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::clients::{SourceClient, TmdbClient};
use crate::constants::cache_keys;
use crate::models::anime::{AnimeDetails, AnimeMetadata};
use crate::models::episode::{EpisodeInfo, ForeignEpisodeRecord, canonical_key};
use crate::models::season::{SeasonDescriptor, SeasonKind};
use crate::parser::source_page;
use crate::services::cache::CacheService;
use crate::services::lock::{LockCoordinator, LockError, LockGuard};
use crate::services::reconcile::build_reconciliation_map;
use crate::services::resolver::SeasonAddressResolver;

pub struct MetadataService {
    cache: Arc<CacheService>,
    locks: Arc<LockCoordinator>,
    source: Arc<SourceClient>,
    tmdb: Option<Arc<TmdbClient>>,
    resolver: Arc<SeasonAddressResolver>,
}

impl MetadataService {
    #[must_use]
    pub fn new(
        cache: Arc<CacheService>,
        locks: Arc<LockCoordinator>,
        source: Arc<SourceClient>,
        tmdb: Option<Arc<TmdbClient>>,
        resolver: Arc<SeasonAddressResolver>,
    ) -> Self {
        Self {
            cache,
            locks,
            source,
            tmdb,
            resolver,
        }
    }

    /// Basic per-anime record from the catalogue page, cached under
    /// `as:{slug}` with the dynamic (ongoing/finished) TTL.
    pub async fn resolve_details(&self, slug: &str) -> Result<Option<AnimeDetails>> {
        let cache_key = format!("{}{slug}", cache_keys::SOURCE_PREFIX);

        if let Some(details) = self.cached_details(&cache_key).await {
            return Ok(Some(details));
        }

        let guard = self.acquire_fetch_lock(slug).await;

        // Double-check: another worker may have filled the cache while we
        // waited on the lock.
        if let Some(details) = self.cached_details(&cache_key).await {
            if let Some(guard) = guard {
                guard.release().await;
            }
            return Ok(Some(details));
        }

        let result = self.fetch_details(slug, &cache_key).await;

        if let Some(guard) = guard {
            guard.release().await;
        }

        result
    }

    async fn cached_details(&self, cache_key: &str) -> Option<AnimeDetails> {
        match self.cache.get::<AnimeDetails>(cache_key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(cache_key, error = %e, "Details cache read failed, treating as miss");
                None
            }
        }
    }

    async fn acquire_fetch_lock(&self, slug: &str) -> Option<LockGuard> {
        let lock_key = format!("metadata_fetch_{slug}");
        match self.locks.acquire_scoped(&lock_key).await {
            Ok(guard) => Some(guard),
            Err(LockError::Unavailable { key, waited }) => {
                warn!(lock_key = %key, ?waited, "Metadata lock unavailable, proceeding unlocked");
                None
            }
            Err(LockError::Storage(e)) => {
                warn!(lock_key, error = %e, "Lock storage failed, proceeding unlocked");
                None
            }
        }
    }

    async fn fetch_details(&self, slug: &str, cache_key: &str) -> Result<Option<AnimeDetails>> {
        let html = match self.source.catalogue_page(slug).await {
            Ok(html) => html,
            Err(e) => {
                warn!(slug, error = %e, "Catalogue page fetch failed");
                return Ok(None);
            }
        };

        let seasons = source_page::parse_seasons(&html);
        if seasons.is_empty() {
            debug!(slug, "No seasons on catalogue page");
            return Ok(None);
        }

        let mut details = AnimeDetails::new(
            slug,
            source_page::parse_title(&html).unwrap_or_else(|| slug.replace('-', " ")),
        );
        details.synopsis = source_page::parse_synopsis(&html);
        details.genres = source_page::parse_genres(&html);
        details.poster = source_page::parse_cover_image(&html);

        let mut languages: Vec<String> = Vec::new();
        for season in &seasons {
            for language in &season.languages {
                if !languages.contains(language) {
                    languages.push(language.clone());
                }
            }
        }
        details.languages = languages;
        details.seasons = seasons;

        if let Err(e) = self.cache.set(cache_key, &details, None).await {
            warn!(slug, error = %e, "Details cache write failed");
        }

        info!(slug, seasons = details.seasons.len(), "Anime details scraped");
        Ok(Some(details))
    }

    /// Full metadata: details plus the per-episode video list, with
    /// episode counts probed live and foreign-catalog enrichment attached
    /// through the reconciliation map. The map is rebuilt on every call;
    /// its validity depends on counts that may have shifted since the last
    /// request.
    pub async fn resolve_anime_metadata(&self, slug: &str) -> Result<Option<AnimeMetadata>> {
        let Some(mut details) = self.resolve_details(slug).await? else {
            return Ok(None);
        };

        self.probe_episode_counts(slug, &mut details.seasons).await;

        let season_counts: Vec<(u32, usize)> = details
            .seasons
            .iter()
            .filter(|s| s.kind.is_ordinary())
            .map(|s| (s.kind.as_number(), s.total_episodes()))
            .collect();

        let foreign = self.foreign_records(slug, &details.title).await;
        let mapping =
            build_reconciliation_map(&foreign, &season_counts, Utc::now().date_naive());
        if !mapping.is_empty() {
            debug!(slug, episodes = mapping.len(), "Reconciliation map built");
        }

        let mut videos = Vec::new();
        for season in &details.seasons {
            match season.kind {
                SeasonKind::Film => {
                    videos.extend(self.film_videos(slug, season).await);
                }
                kind => {
                    let number = kind.as_number();
                    for episode in 1..=season.total_episodes() {
                        let episode = episode as u32;
                        let key = canonical_key(number, episode);
                        let record = mapping.get(&key);
                        videos.push(self.video_entry(slug, number, episode, record));
                    }
                }
            }
        }

        Ok(Some(AnimeMetadata { details, videos }))
    }

    /// Probes per-language episode counts for every season, in parallel
    /// across (season, language) pairs. A season's total for one language
    /// spans its main page plus its sub-seasons.
    async fn probe_episode_counts(&self, slug: &str, seasons: &mut [SeasonDescriptor]) {
        let mut probes = Vec::new();
        for (index, season) in seasons.iter().enumerate() {
            for language in season.languages.clone() {
                let season = season.clone();
                probes.push(async move {
                    let mut total = self
                        .resolver
                        .resolve_count(slug, &season.path, &language)
                        .await;
                    for sub in &season.sub_seasons {
                        total += self.resolver.resolve_count(slug, &sub.path, &language).await;
                    }
                    (index, language, total)
                });
            }
        }

        let results = join_all(probes).await;
        for (index, language, total) in results {
            seasons[index].episode_counts.insert(language, total);
        }
    }

    /// Foreign-catalog episode records for the anime, cached under the
    /// foreign namespace with its long TTL. Any failure reads as "no
    /// enrichment".
    async fn foreign_records(&self, slug: &str, title: &str) -> Vec<ForeignEpisodeRecord> {
        let Some(tmdb) = &self.tmdb else {
            return Vec::new();
        };

        let cache_key = format!("{}episodes:{slug}", cache_keys::FOREIGN_PREFIX);
        if let Ok(Some(records)) = self.cache.get::<Vec<ForeignEpisodeRecord>>(&cache_key).await {
            return records;
        }

        let records = match self.fetch_foreign_records(tmdb, title).await {
            Ok(records) => records,
            Err(e) => {
                warn!(slug, error = %e, "Foreign catalog fetch failed");
                return Vec::new();
            }
        };

        if let Err(e) = self.cache.set(&cache_key, &records, None).await {
            warn!(slug, error = %e, "Foreign records cache write failed");
        }

        records
    }

    async fn fetch_foreign_records(
        &self,
        tmdb: &TmdbClient,
        title: &str,
    ) -> Result<Vec<ForeignEpisodeRecord>> {
        let Some(hit) = tmdb.search_tv(title).await? else {
            debug!(title, "No foreign catalog entry");
            return Ok(Vec::new());
        };

        let details = tmdb.tv_details(hit.id).await?;
        let mut records = tmdb.all_episodes(&details).await?;
        for record in &mut records {
            if let Some(still) = &record.still_path {
                record.still_path = Some(tmdb.still_url(still));
            }
        }
        Ok(records)
    }

    /// The film pseudo-season gets its titles from the film listing page
    /// rather than the foreign catalog.
    async fn film_videos(&self, slug: &str, season: &SeasonDescriptor) -> Vec<EpisodeInfo> {
        let language = season
            .languages
            .first()
            .map_or("vostfr", String::as_str);

        let titles = match self.source.season_page(slug, &season.path, language).await {
            Ok(html) => source_page::film_titles(&html),
            Err(e) => {
                warn!(slug, error = %e, "Film listing fetch failed");
                Vec::new()
            }
        };

        let number = season.kind.as_number();
        let count = titles.len().max(season.total_episodes());

        (1..=count)
            .map(|index| {
                let episode = index as u32;
                EpisodeInfo {
                    id: format!("{}{slug}:{}", cache_keys::SOURCE_PREFIX, canonical_key(number, episode)),
                    season: number,
                    episode,
                    title: titles
                        .get(index - 1)
                        .cloned()
                        .unwrap_or_else(|| format!("Film {episode}")),
                    overview: None,
                    thumbnail: None,
                    released: None,
                }
            })
            .collect()
    }

    fn video_entry(
        &self,
        slug: &str,
        season: u32,
        episode: u32,
        record: Option<&ForeignEpisodeRecord>,
    ) -> EpisodeInfo {
        EpisodeInfo {
            id: format!("{}{slug}:{}", cache_keys::SOURCE_PREFIX, canonical_key(season, episode)),
            season,
            episode,
            title: record
                .and_then(|r| r.title.clone())
                .unwrap_or_else(|| format!("Episode {episode}")),
            overview: record.and_then(|r| r.overview.clone()),
            thumbnail: record.and_then(|r| r.still_path.clone()),
            released: record.and_then(|r| r.air_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpClient;
    use crate::config::{CacheConfig, SourceConfig};
    use crate::db::Store;
    use crate::services::resolver::EpisodeCounter;
    use std::time::Duration;

    struct NoEpisodes;

    #[async_trait::async_trait]
    impl EpisodeCounter for NoEpisodes {
        async fn episode_count(&self, _slug: &str, _path: &str, _language: &str) -> usize {
            0
        }
    }

    async fn service() -> MetadataService {
        let store = Arc::new(Store::new("sqlite::memory:").await.unwrap());
        let config = SourceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            retry_attempts: 0,
            request_timeout_seconds: 1,
            ..SourceConfig::default()
        };
        let http = HttpClient::new(&config).unwrap();
        let source = Arc::new(crate::clients::SourceClient::new(http, config.base_url.as_str()));
        MetadataService::new(
            Arc::new(CacheService::new(store.clone(), CacheConfig::default())),
            Arc::new(LockCoordinator::new(
                store,
                Duration::from_secs(300),
                Duration::from_secs(1),
            )),
            source,
            None,
            Arc::new(SeasonAddressResolver::new(Arc::new(NoEpisodes))),
        )
    }

    #[tokio::test]
    async fn video_entries_fall_back_to_generic_titles() {
        let svc = service().await;

        let plain = svc.video_entry("demo", 2, 5, None);
        assert_eq!(plain.id, "as:demo:s2e5");
        assert_eq!(plain.title, "Episode 5");
        assert!(plain.released.is_none());

        let record = ForeignEpisodeRecord {
            season: 1,
            episode: 17,
            air_date: Some("2023-05-14".parse().unwrap()),
            title: Some("Le Départ".to_string()),
            overview: Some("Résumé".to_string()),
            still_path: Some("https://img/still.jpg".to_string()),
        };
        let enriched = svc.video_entry("demo", 2, 5, Some(&record));
        assert_eq!(enriched.title, "Le Départ");
        assert_eq!(enriched.released, Some("2023-05-14".parse().unwrap()));
        assert_eq!(enriched.thumbnail.as_deref(), Some("https://img/still.jpg"));
    }

    #[tokio::test]
    async fn unreachable_source_resolves_to_none() {
        let svc = service().await;
        assert!(svc.resolve_details("unknown-anime").await.unwrap().is_none());
    }
}
