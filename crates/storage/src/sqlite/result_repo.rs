use cardak_core::model::{ResultId, TestId, TestResult};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    answers_from_json, answers_to_json, conn, id_i64, result_id_from_i64, score_from_db,
    score_to_db, ser, test_id_from_i64, u32_from_i64,
};
use crate::repository::{ResultRepository, StorageError, TestResultRow};

fn map_result_row(row: &SqliteRow) -> Result<TestResult, StorageError> {
    let answers: String = row.try_get("answers").map_err(ser)?;
    TestResult::from_persisted(
        test_id_from_i64(row.try_get("test_id").map_err(ser)?)?,
        score_from_db(row.try_get("score").map_err(ser)?)?,
        u32_from_i64("correct", row.try_get("correct").map_err(ser)?)?,
        u32_from_i64("scoreable", row.try_get("scoreable").map_err(ser)?)?,
        answers_from_json(&answers)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn append_result(&self, result: &TestResult) -> Result<ResultId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO test_results (
                    test_id, score, correct, scoreable, answers, started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_i64("test_id", result.test_id().value())?)
        .bind(score_to_db(result.score()))
        .bind(i64::from(result.correct()))
        .bind(i64::from(result.scoreable()))
        .bind(answers_to_json(result.answers())?)
        .bind(result.started_at())
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        result_id_from_i64(res.last_insert_rowid())
    }

    async fn get_result(&self, id: ResultId) -> Result<TestResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT test_id, score, correct, scoreable, answers, started_at, completed_at
                FROM test_results
                WHERE id = ?1
            ",
        )
        .bind(id_i64("result_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_results(
        &self,
        test_id: TestId,
        limit: u32,
    ) -> Result<Vec<TestResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, test_id, score, correct, scoreable, answers, started_at, completed_at
                FROM test_results
                WHERE test_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(id_i64("test_id", test_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(TestResultRow {
                id: result_id_from_i64(row.try_get("id").map_err(ser)?)?,
                result: map_result_row(&row)?,
            });
        }
        Ok(out)
    }
}
