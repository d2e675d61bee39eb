pub mod aggregator;
pub mod cache;
pub mod lock;
pub mod metadata;
pub mod rate_limit;
pub mod reconcile;
pub mod resolver;
pub mod schedule;
pub mod sweeper;

pub use aggregator::StreamAggregator;
pub use cache::{CacheService, OngoingProbe};
pub use lock::{LockCoordinator, LockError, LockGuard};
pub use metadata::MetadataService;
pub use rate_limit::RateLimiter;
pub use resolver::{EpisodeCounter, SeasonAddressResolver, SourceEpisodeCounter};
pub use schedule::ScheduleService;
pub use sweeper::spawn_expiry_sweeper;
