use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;
use url::Url;

use crate::repository::{Storage, normalize_asset_base};

mod asset_repo;
mod forum_repo;
mod mapping;
mod migrate;
mod photo_repo;
mod result_repo;
mod test_repo;

/// Public base used when no asset base url is configured.
pub const DEFAULT_ASSET_BASE: &str = "http://localhost:8080/assets/";

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    asset_base: Url,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid asset base url: {0}")]
    AssetBase(#[from] url::ParseError),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the connection pragmas fail during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        tracing::debug!(database_url, "sqlite pool connected");
        Ok(Self {
            pool,
            asset_base: Url::parse(DEFAULT_ASSET_BASE)?,
        })
    }

    /// Serve uploaded assets under `base` instead of the default.
    #[must_use]
    pub fn with_asset_base(mut self, base: Url) -> Self {
        self.asset_base = normalize_asset_base(base);
        self
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub fn asset_base(&self) -> &Url {
        &self.asset_base
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`, with assets served under `asset_base`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str, asset_base: Url) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url)
            .await?
            .with_asset_base(asset_base);
        repo.migrate().await?;
        Ok(Self::from_gateway(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[test]
    fn default_asset_base_parses() {
        let base = Url::parse(DEFAULT_ASSET_BASE).unwrap();
        assert!(base.path().ends_with('/'));
    }
}
