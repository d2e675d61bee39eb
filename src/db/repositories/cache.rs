use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{cache_entry, prelude::*};

pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Fetches a non-expired entry. Expired rows under the same key are
    /// deleted opportunistically so the table does not grow unbounded
    /// between sweeps.
    pub async fn get(&self, key: &str, now: i64) -> Result<Option<cache_entry::Model>> {
        let _ = CacheEntry::delete_many()
            .filter(cache_entry::Column::Key.eq(key))
            .filter(cache_entry::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await;

        let entry = CacheEntry::find()
            .filter(cache_entry::Column::Key.eq(key))
            .filter(cache_entry::Column::ExpiresAt.gt(now))
            .one(&self.conn)
            .await?;

        Ok(entry)
    }

    pub async fn upsert(
        &self,
        key: &str,
        namespace: &str,
        payload: String,
        created_at: i64,
        expires_at: i64,
    ) -> Result<()> {
        let active_model = cache_entry::ActiveModel {
            key: Set(key.to_string()),
            namespace: Set(namespace.to_string()),
            payload: Set(payload),
            created_at: Set(created_at),
            expires_at: Set(expires_at),
        };

        CacheEntry::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(cache_entry::Column::Key)
                    .update_columns([
                        cache_entry::Column::Namespace,
                        cache_entry::Column::Payload,
                        cache_entry::Column::CreatedAt,
                        cache_entry::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        CacheEntry::delete_many()
            .filter(cache_entry::Column::Key.eq(key))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// Deletes every row past its expiry. Returns the number removed.
    pub async fn sweep_expired(&self, now: i64) -> Result<u64> {
        let res = CacheEntry::delete_many()
            .filter(cache_entry::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await?;
        Ok(res.rows_affected)
    }
}
