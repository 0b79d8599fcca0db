use std::collections::HashMap;

use cardak_core::model::{OptionDraft, QuestionDraft, QuestionId, Test, TestId, ValidatedTest};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, map_option_row, map_question_row, ser, test_id_from_i64, u32_from_i64,
};
use crate::repository::{StorageError, TestListing, TestRepository};

fn map_listing_row(row: &SqliteRow) -> Result<TestListing, StorageError> {
    Ok(TestListing {
        id: test_id_from_i64(row.try_get("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        created_by: row.try_get("created_by").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        question_count: u32_from_i64(
            "question_count",
            row.try_get("question_count").map_err(ser)?,
        )?,
    })
}

#[async_trait::async_trait]
impl TestRepository for SqliteRepository {
    async fn insert_test(&self, test: &ValidatedTest) -> Result<TestId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO tests (title, description, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(&test.title)
        .bind(&test.description)
        .bind(&test.created_by)
        .bind(test.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let test_id = res.last_insert_rowid();

        for (position, question) in test.questions.iter().enumerate() {
            let question_id = id_i64("question_id", question.id().value())?;
            sqlx::query(
                r"
                INSERT INTO questions (test_id, id, position, kind, text, image_url)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(test_id)
            .bind(question_id)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(question.kind().as_str())
            .bind(question.text())
            .bind(question.image_url().map(url::Url::as_str))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (opt_position, option) in question.options().iter().enumerate() {
                sqlx::query(
                    r"
                    INSERT INTO options (test_id, question_id, id, position, text, is_correct)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(test_id)
                .bind(question_id)
                .bind(id_i64("option_id", option.id().value())?)
                .bind(i64::try_from(opt_position).map_err(ser)?)
                .bind(option.text())
                .bind(i64::from(option.is_correct()))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        test_id_from_i64(test_id)
    }

    async fn get_test(&self, id: TestId) -> Result<Test, StorageError> {
        let test_id = id_i64("test_id", id.value())?;

        let header = sqlx::query(
            r"
            SELECT id, title, description, created_by, created_at
            FROM tests WHERE id = ?1
            ",
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let question_rows = sqlx::query(
            r"
            SELECT id, kind, text, image_url
            FROM questions
            WHERE test_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let option_rows = sqlx::query(
            r"
            SELECT question_id, id, text, is_correct
            FROM options
            WHERE test_id = ?1
            ORDER BY question_id ASC, position ASC
            ",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut options: HashMap<QuestionId, Vec<OptionDraft>> = HashMap::new();
        for row in &option_rows {
            let (question_id, option) = map_option_row(row)?;
            options.entry(question_id).or_default().push(option);
        }

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            let mut draft: QuestionDraft = map_question_row(row)?;
            draft.options = options.remove(&draft.id).unwrap_or_default();
            questions.push(draft.validate().map_err(ser)?);
        }

        Test::from_persisted(
            test_id_from_i64(header.try_get("id").map_err(ser)?)?,
            header.try_get::<String, _>("title").map_err(ser)?,
            header.try_get::<String, _>("description").map_err(ser)?,
            header.try_get::<String, _>("created_by").map_err(ser)?,
            header.try_get("created_at").map_err(ser)?,
            questions,
        )
        .map_err(ser)
    }

    async fn list_tests(&self, limit: u32) -> Result<Vec<TestListing>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT t.id, t.title, t.description, t.created_by, t.created_at,
                   (SELECT COUNT(*) FROM questions q WHERE q.test_id = t.id) AS question_count
            FROM tests t
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_listing_row).collect()
    }
}
