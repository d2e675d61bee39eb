pub mod prelude;

pub mod cache_entry;
pub mod scrape_lock;
