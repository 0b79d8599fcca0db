use cardak_core::model::{NewPhoto, Photo, PhotoId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use url::Url;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, photo_id_from_i64, ser, u32_from_i64};
use crate::repository::{PhotoRepository, StorageError};

fn map_photo_row(row: &SqliteRow) -> Result<Photo, StorageError> {
    let url: String = row.try_get("url").map_err(ser)?;
    Ok(Photo {
        id: photo_id_from_i64(row.try_get("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        url: Url::parse(&url).map_err(ser)?,
        uploaded_by: row.try_get("uploaded_by").map_err(ser)?,
        uploaded_at: row.try_get("uploaded_at").map_err(ser)?,
        likes: u32_from_i64("likes", row.try_get("likes").map_err(ser)?)?,
    })
}

#[async_trait::async_trait]
impl PhotoRepository for SqliteRepository {
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO photos (title, url, uploaded_by, uploaded_at, likes)
            VALUES (?1, ?2, ?3, ?4, 0)
            ",
        )
        .bind(&photo.title)
        .bind(photo.url.as_str())
        .bind(&photo.uploaded_by)
        .bind(photo.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        photo_id_from_i64(res.last_insert_rowid())
    }

    async fn get_photo(&self, id: PhotoId) -> Result<Photo, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, url, uploaded_by, uploaded_at, likes
            FROM photos WHERE id = ?1
            ",
        )
        .bind(id_i64("photo_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_photo_row(&row)
    }

    async fn list_photos(&self, limit: u32) -> Result<Vec<Photo>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, url, uploaded_by, uploaded_at, likes
            FROM photos
            ORDER BY uploaded_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_photo_row).collect()
    }

    async fn like_photo(&self, id: PhotoId) -> Result<u32, StorageError> {
        let row = sqlx::query("UPDATE photos SET likes = likes + 1 WHERE id = ?1 RETURNING likes")
            .bind(id_i64("photo_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        u32_from_i64("likes", row.try_get("likes").map_err(ser)?)
    }
}
