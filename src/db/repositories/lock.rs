use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{prelude::*, scrape_lock};

pub struct LockRepository {
    conn: DatabaseConnection,
}

impl LockRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert-if-absent. Silently does nothing when a row already holds the
    /// key; callers re-read to learn who owns it.
    pub async fn insert_ignore(
        &self,
        lock_key: &str,
        owner_id: &str,
        acquired_at: i64,
        expires_at: i64,
    ) -> Result<()> {
        let active_model = scrape_lock::ActiveModel {
            lock_key: Set(lock_key.to_string()),
            owner_id: Set(owner_id.to_string()),
            acquired_at: Set(acquired_at),
            expires_at: Set(expires_at),
        };

        ScrapeLock::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(scrape_lock::Column::LockKey)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn find(&self, lock_key: &str) -> Result<Option<scrape_lock::Model>> {
        let row = ScrapeLock::find_by_id(lock_key).one(&self.conn).await?;
        Ok(row)
    }

    /// Removes the row only if it is past expiry. Returns whether a row was
    /// actually deleted, so racing reclaimers can tell who won.
    pub async fn delete_expired(&self, lock_key: &str, now: i64) -> Result<bool> {
        let res = ScrapeLock::delete_many()
            .filter(scrape_lock::Column::LockKey.eq(lock_key))
            .filter(scrape_lock::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn delete_owned(&self, lock_key: &str, owner_id: &str) -> Result<bool> {
        let res = ScrapeLock::delete_many()
            .filter(scrape_lock::Column::LockKey.eq(lock_key))
            .filter(scrape_lock::Column::OwnerId.eq(owner_id))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn sweep_expired(&self, now: i64) -> Result<u64> {
        let res = ScrapeLock::delete_many()
            .filter(scrape_lock::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected)
    }
}
