//! Shared error types for the services crate.

use thiserror::Error;

use cardak_core::model::{
    PhotoError, PostError, QuestionId, QuestionKind, QuizError, TestResultError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::assets::AssetNameError;
use crate::sessions::Phase;

/// Errors emitted by quiz sessions and the quiz loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("test has no questions")]
    InvalidTest,
    #[error("operation not allowed while the session is {phase}")]
    InvalidState { phase: Phase },
    #[error("question {0} is not part of this test")]
    UnknownQuestion(QuestionId),
    #[error("answer does not fit {kind} question {question}")]
    AnswerMismatch {
        question: QuestionId,
        kind: QuestionKind,
    },
    #[error(transparent)]
    Result(#[from] TestResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TestService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestServiceError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Asset(#[from] AssetNameError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PhotoService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PhotoServiceError {
    #[error(transparent)]
    Photo(#[from] PhotoError),
    #[error(transparent)]
    Asset(#[from] AssetNameError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ForumService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ForumServiceError {
    #[error(transparent)]
    Post(#[from] PostError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
