use cardak_core::model::{
    GradedAnswer, OptionDraft, OptionId, PhotoId, PostId, QuestionDraft, QuestionId, QuestionKind,
    ResultId, TestId,
};
use cardak_core::scoring::Score;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn test_id_from_i64(v: i64) -> Result<TestId, StorageError> {
    Ok(TestId::new(i64_to_u64("test_id", v)?))
}

pub(crate) fn result_id_from_i64(v: i64) -> Result<ResultId, StorageError> {
    Ok(ResultId::new(i64_to_u64("result_id", v)?))
}

pub(crate) fn photo_id_from_i64(v: i64) -> Result<PhotoId, StorageError> {
    Ok(PhotoId::new(i64_to_u64("photo_id", v)?))
}

pub(crate) fn post_id_from_i64(v: i64) -> Result<PostId, StorageError> {
    Ok(PostId::new(i64_to_u64("post_id", v)?))
}

/// `NotApplicable` is stored as NULL.
pub(crate) fn score_to_db(score: Score) -> Option<i64> {
    score.percent().map(i64::from)
}

pub(crate) fn score_from_db(value: Option<i64>) -> Result<Score, StorageError> {
    match value {
        None => Ok(Score::NotApplicable),
        Some(v) => u8::try_from(v)
            .ok()
            .filter(|p| *p <= 100)
            .map(Score::Percent)
            .ok_or_else(|| StorageError::Serialization(format!("invalid score: {v}"))),
    }
}

pub(crate) fn answers_to_json(answers: &[GradedAnswer]) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn answers_from_json(raw: &str) -> Result<Vec<GradedAnswer>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

/// Question row without its options; options are attached by the caller.
pub(crate) fn map_question_row(row: &SqliteRow) -> Result<QuestionDraft, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(QuestionDraft {
        id: QuestionId::new(i64_to_u64("question_id", row.try_get("id").map_err(ser)?)?),
        kind: kind.parse::<QuestionKind>().map_err(ser)?,
        text: row.try_get("text").map_err(ser)?,
        image_url: row.try_get("image_url").map_err(ser)?,
        options: Vec::new(),
    })
}

pub(crate) fn map_option_row(row: &SqliteRow) -> Result<(QuestionId, OptionDraft), StorageError> {
    let question = QuestionId::new(i64_to_u64(
        "question_id",
        row.try_get("question_id").map_err(ser)?,
    )?);
    let option = OptionDraft {
        id: OptionId::new(i64_to_u64("option_id", row.try_get("id").map_err(ser)?)?),
        text: row.try_get("text").map_err(ser)?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
    };
    Ok((question, option))
}
