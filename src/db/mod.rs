use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{cache_entry, scrape_lock};

pub mod migrator;
pub mod repositories;

#[derive(Clone, Debug)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn cache_repo(&self) -> repositories::CacheRepository {
        repositories::CacheRepository::new(self.conn.clone())
    }

    fn lock_repo(&self) -> repositories::LockRepository {
        repositories::LockRepository::new(self.conn.clone())
    }

    pub async fn cache_get(&self, key: &str, now: i64) -> Result<Option<cache_entry::Model>> {
        self.cache_repo().get(key, now).await
    }

    pub async fn cache_set(
        &self,
        key: &str,
        namespace: &str,
        payload: String,
        created_at: i64,
        expires_at: i64,
    ) -> Result<()> {
        self.cache_repo()
            .upsert(key, namespace, payload, created_at, expires_at)
            .await
    }

    pub async fn cache_delete(&self, key: &str) -> Result<()> {
        self.cache_repo().delete(key).await
    }

    pub async fn cache_sweep(&self, now: i64) -> Result<u64> {
        self.cache_repo().sweep_expired(now).await
    }

    pub async fn lock_try_insert(
        &self,
        lock_key: &str,
        owner_id: &str,
        acquired_at: i64,
        expires_at: i64,
    ) -> Result<()> {
        self.lock_repo()
            .insert_ignore(lock_key, owner_id, acquired_at, expires_at)
            .await
    }

    pub async fn lock_find(&self, lock_key: &str) -> Result<Option<scrape_lock::Model>> {
        self.lock_repo().find(lock_key).await
    }

    pub async fn lock_delete_expired(&self, lock_key: &str, now: i64) -> Result<bool> {
        self.lock_repo().delete_expired(lock_key, now).await
    }

    pub async fn lock_release(&self, lock_key: &str, owner_id: &str) -> Result<bool> {
        self.lock_repo().delete_owned(lock_key, owner_id).await
    }

    pub async fn lock_sweep(&self, now: i64) -> Result<u64> {
        self.lock_repo().sweep_expired(now).await
    }
}
