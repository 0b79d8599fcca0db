use cardak_core::model::{ForumPost, NewPost, PostId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, post_id_from_i64, ser};
use crate::repository::{ForumRepository, StorageError};

fn map_post_row(row: &SqliteRow) -> Result<ForumPost, StorageError> {
    Ok(ForumPost {
        id: post_id_from_i64(row.try_get("id").map_err(ser)?)?,
        username: row.try_get("username").map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl ForumRepository for SqliteRepository {
    async fn insert_post(&self, post: &NewPost) -> Result<PostId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO forum_posts (username, content, created_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(&post.username)
        .bind(&post.content)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        post_id_from_i64(res.last_insert_rowid())
    }

    async fn list_posts(&self, limit: u32) -> Result<Vec<ForumPost>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, username, content, created_at
            FROM forum_posts
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_post_row).collect()
    }
}
