use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::{DatasetIndex, HttpClient, SourceClient, TmdbClient};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    CacheService, LockCoordinator, MetadataService, RateLimiter, ScheduleService,
    SeasonAddressResolver, SourceEpisodeCounter, StreamAggregator,
};

/// Everything the request handlers and background tasks share. Built once
/// at startup; services reference each other through `Arc`s.
pub struct SharedState {
    pub config: Config,

    pub store: Arc<Store>,

    pub source: Arc<SourceClient>,

    pub tmdb: Option<Arc<TmdbClient>>,

    pub dataset: Arc<DatasetIndex>,

    pub cache: Arc<CacheService>,

    pub locks: Arc<LockCoordinator>,

    pub limiter: Arc<RateLimiter>,

    pub schedule: Arc<ScheduleService>,

    pub resolver: Arc<SeasonAddressResolver>,

    pub metadata: Arc<MetadataService>,

    pub aggregator: Arc<StreamAggregator>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(
            Store::with_pool_options(
                &config.general.database_path,
                config.general.max_db_connections,
                config.general.min_db_connections,
            )
            .await?,
        );

        let http = HttpClient::new(&config.source)?;
        let source = Arc::new(SourceClient::new(http, config.source.base_url.as_str()));

        let tmdb = config
            .tmdb
            .enabled
            .then(|| Arc::new(TmdbClient::new(config.tmdb.clone())));

        let dataset = Arc::new(if config.dataset.enabled {
            DatasetIndex::load(Path::new(&config.dataset.path))
        } else {
            DatasetIndex::empty()
        });

        let cache = Arc::new(CacheService::new(store.clone(), config.cache.clone()));
        let locks = Arc::new(LockCoordinator::new(
            store.clone(),
            Duration::from_secs(config.cache.lock_ttl),
            Duration::from_secs(config.cache.lock_wait_timeout),
        ));
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(
            config.source.rate_limit_ms,
        )));

        let schedule = Arc::new(ScheduleService::new(cache.clone(), source.clone()));
        cache.attach_schedule(schedule.clone());

        let counter = Arc::new(SourceEpisodeCounter::new(source.clone()));
        let resolver = Arc::new(SeasonAddressResolver::new(counter));

        let metadata = Arc::new(MetadataService::new(
            cache.clone(),
            locks.clone(),
            source.clone(),
            tmdb.clone(),
            resolver.clone(),
        ));

        let aggregator = Arc::new(StreamAggregator::new(
            cache.clone(),
            source.clone(),
            limiter.clone(),
            dataset.clone(),
            resolver.clone(),
            metadata.clone(),
            config.source.excluded_domains.clone(),
        ));

        Ok(Self {
            config,
            store,
            source,
            tmdb,
            dataset,
            cache,
            locks,
            limiter,
            schedule,
            resolver,
            metadata,
            aggregator,
        })
    }
}
