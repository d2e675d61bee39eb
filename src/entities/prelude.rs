pub use super::cache_entry::Entity as CacheEntry;
pub use super::scrape_lock::Entity as ScrapeLock;
