//! Background expiry sweep.
//!
//! Expired cache rows are already invisible to readers; the sweep only
//! reclaims storage and clears abandoned scrape locks so the database does
//! not grow without bound.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::constants::intervals;
use crate::db::Store;

pub fn spawn_expiry_sweeper(store: Arc<Store>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(intervals::EXPIRY_SWEEP);
        // The first tick fires immediately; skip it so startup is quiet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let now = Utc::now().timestamp();

            match store.cache_sweep(now).await {
                Ok(0) => {}
                Ok(swept) => debug!(swept, "Expired cache entries removed"),
                Err(e) => warn!(error = %e, "Cache sweep failed"),
            }

            match store.lock_sweep(now).await {
                Ok(0) => {}
                Ok(swept) => debug!(swept, "Expired scrape locks removed"),
                Err(e) => warn!(error = %e, "Lock sweep failed"),
            }
        }
    })
}
