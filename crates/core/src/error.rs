use thiserror::Error;

use crate::model::{PhotoError, PostError, QuizError, TestResultError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Result(#[from] TestResultError),
    #[error(transparent)]
    Photo(#[from] PhotoError),
    #[error(transparent)]
    Post(#[from] PostError),
}
