//! Cooperative distributed locking over the shared SQLite store.
//!
//! Best-effort, not linearizable: two racing acquirers can both observe an
//! absent row under weak isolation. The cost of a lost race is one duplicate
//! fetch, which callers accept. Stale rows left by a crashed owner are
//! reclaimed as soon as `expires_at` has passed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::intervals;
use crate::db::Store;

#[derive(Debug, Error)]
pub enum LockError {
    /// The lock stayed held by someone else for the whole wait window.
    /// Callers treat this as non-fatal and proceed without exclusivity.
    #[error("Lock '{key}' unavailable after {waited:?}")]
    Unavailable { key: String, waited: Duration },

    #[error("Lock storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub struct LockCoordinator {
    store: Arc<Store>,
    lock_ttl: Duration,
    wait_timeout: Duration,
}

impl LockCoordinator {
    #[must_use]
    pub fn new(store: Arc<Store>, lock_ttl: Duration, wait_timeout: Duration) -> Self {
        Self {
            store,
            lock_ttl,
            wait_timeout,
        }
    }

    /// Single non-blocking attempt: insert-if-absent, then re-check who owns
    /// the row. An expired row is deleted and the insert retried once.
    pub async fn acquire(&self, lock_key: &str, owner_id: &str) -> Result<bool> {
        for _ in 0..2 {
            let now = Utc::now().timestamp();
            let expires_at =
                now.saturating_add(i64::try_from(self.lock_ttl.as_secs()).unwrap_or(i64::MAX));

            self.store
                .lock_try_insert(lock_key, owner_id, now, expires_at)
                .await?;

            match self.store.lock_find(lock_key).await? {
                Some(row) if row.owner_id == owner_id && row.expires_at > now => {
                    debug!(lock_key, owner_id, "Lock acquired");
                    return Ok(true);
                }
                Some(row) if row.expires_at <= now => {
                    debug!(lock_key, "Reclaiming stale lock");
                    self.store.lock_delete_expired(lock_key, now).await?;
                    // retry the insert once
                }
                _ => return Ok(false),
            }
        }

        Ok(false)
    }

    pub async fn release(&self, lock_key: &str, owner_id: &str) -> Result<bool> {
        let released = self.store.lock_release(lock_key, owner_id).await?;
        if released {
            debug!(lock_key, owner_id, "Lock released");
        }
        Ok(released)
    }

    /// Polls [`Self::acquire`] until success or the overall wait timeout
    /// elapses, then fails with [`LockError::Unavailable`].
    pub async fn acquire_scoped(&self, lock_key: &str) -> Result<LockGuard, LockError> {
        let owner_id = Uuid::new_v4().to_string();
        let deadline = tokio::time::Instant::now() + self.wait_timeout;

        loop {
            if self.acquire(lock_key, &owner_id).await? {
                return Ok(LockGuard {
                    store: Arc::clone(&self.store),
                    lock_key: lock_key.to_string(),
                    owner_id,
                });
            }

            if tokio::time::Instant::now() + intervals::LOCK_POLL > deadline {
                return Err(LockError::Unavailable {
                    key: lock_key.to_string(),
                    waited: self.wait_timeout,
                });
            }

            tokio::time::sleep(intervals::LOCK_POLL).await;
        }
    }
}

/// A held lock. There is no async Drop, so callers release explicitly; a
/// forgotten guard is reclaimed by expiry instead of leaking forever.
#[derive(Debug)]
pub struct LockGuard {
    store: Arc<Store>,
    lock_key: String,
    owner_id: String,
}

impl LockGuard {
    pub async fn release(self) {
        match self
            .store
            .lock_release(&self.lock_key, &self.owner_id)
            .await
        {
            Ok(true) => debug!(lock_key = %self.lock_key, "Lock released"),
            Ok(false) => debug!(lock_key = %self.lock_key, "Lock already gone at release"),
            Err(e) => warn!(lock_key = %self.lock_key, error = %e, "Failed to release lock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn coordinator() -> LockCoordinator {
        let store = Store::new("sqlite::memory:").await.unwrap();
        LockCoordinator::new(
            Arc::new(store),
            Duration::from_secs(300),
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn second_owner_is_refused_while_held() {
        let locks = coordinator().await;

        assert!(locks.acquire("scrape:demo", "owner-a").await.unwrap());
        assert!(!locks.acquire("scrape:demo", "owner-b").await.unwrap());

        assert!(locks.release("scrape:demo", "owner-a").await.unwrap());
        assert!(locks.acquire("scrape:demo", "owner-b").await.unwrap());
    }

    #[tokio::test]
    async fn release_requires_ownership() {
        let locks = coordinator().await;

        assert!(locks.acquire("scrape:demo", "owner-a").await.unwrap());
        assert!(!locks.release("scrape:demo", "owner-b").await.unwrap());
        assert!(locks.release("scrape:demo", "owner-a").await.unwrap());
    }

    #[tokio::test]
    async fn reacquiring_while_held_is_idempotent_for_the_owner() {
        let locks = coordinator().await;

        assert!(locks.acquire("scrape:demo", "owner-a").await.unwrap());
        assert!(locks.acquire("scrape:demo", "owner-a").await.unwrap());
    }

    #[tokio::test]
    async fn oversized_lock_ttl_saturates_instead_of_overflowing() {
        let store = Arc::new(Store::new("sqlite::memory:").await.unwrap());
        let locks = LockCoordinator::new(
            Arc::clone(&store),
            Duration::MAX,
            Duration::from_secs(1),
        );

        assert!(locks.acquire("scrape:demo", "owner-a").await.unwrap());

        let row = store.lock_find("scrape:demo").await.unwrap().unwrap();
        assert_eq!(row.expires_at, i64::MAX);
    }

    #[tokio::test]
    async fn scoped_acquire_times_out_with_distinguished_error() {
        let store = Arc::new(Store::new("sqlite::memory:").await.unwrap());
        let locks = LockCoordinator::new(
            Arc::clone(&store),
            Duration::from_secs(300),
            Duration::from_millis(10),
        );

        assert!(locks.acquire("scrape:demo", "owner-a").await.unwrap());

        let err = locks.acquire_scoped("scrape:demo").await.unwrap_err();
        assert!(matches!(err, LockError::Unavailable { .. }));
    }
}
