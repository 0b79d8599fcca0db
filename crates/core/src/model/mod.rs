mod answer;
mod forum;
mod ids;
mod photo;
mod quiz;
mod result;

pub use ids::{OptionId, ParseIdError, PhotoId, PostId, QuestionId, ResultId, TestId};

pub use answer::{Answer, AnswerSheet, Response};
pub use forum::{ForumPost, MAX_POST_CHARS, NewPost, PostDraft, PostError};
pub use photo::{NewPhoto, Photo, PhotoDraft, PhotoError};
pub use quiz::{
    AnswerOption, OptionDraft, Question, QuestionDraft, QuestionKind, QuizError, Test, TestDraft,
    ValidatedTest,
};
pub use result::{GradedAnswer, TestResult, TestResultError};
