use chrono::Utc;
use sqlx::Row;
use url::Url;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{AssetStore, StorageError, asset_key, public_url};

#[async_trait::async_trait]
impl AssetStore for SqliteRepository {
    async fn upload_asset(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
    ) -> Result<Url, StorageError> {
        let key = asset_key(bucket, path)?;
        let url = public_url(&self.asset_base, &key)?;

        let res = sqlx::query(
            r"
            INSERT INTO assets (key, bytes, uploaded_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO NOTHING
            ",
        )
        .bind(&key)
        .bind(bytes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        tracing::debug!(%key, size = bytes.len(), "stored asset");
        Ok(url)
    }

    async fn fetch_asset(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let key = asset_key(bucket, path)?;
        let row = sqlx::query("SELECT bytes FROM assets WHERE key = ?1")
            .bind(&key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        row.try_get::<Vec<u8>, _>("bytes").map_err(ser)
    }
}
