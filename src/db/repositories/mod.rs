pub mod cache;
pub mod lock;

pub use cache::CacheRepository;
pub use lock::LockRepository;
