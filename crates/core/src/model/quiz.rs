use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::model::ids::{OptionId, QuestionId, TestId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("test title cannot be empty")]
    EmptyTitle,

    #[error("question {question} has no text")]
    EmptyQuestionText { question: QuestionId },

    #[error("option {option} of question {question} has no text")]
    EmptyOptionText {
        question: QuestionId,
        option: OptionId,
    },

    #[error("question {question} needs at least one option")]
    MissingOptions { question: QuestionId },

    #[error("open-ended question {question} cannot carry options")]
    UnexpectedOptions { question: QuestionId },

    #[error("question {question} has no correct option")]
    NoCorrectOption { question: QuestionId },

    #[error("question {question} has {count} correct options, expected exactly one")]
    MultipleCorrectOptions { question: QuestionId, count: usize },

    #[error("image-based question {question} needs an image url")]
    MissingImage { question: QuestionId },

    #[error("only image-based questions carry an image, question {question} is not one")]
    UnexpectedImage { question: QuestionId },

    #[error("invalid image url for question {question}: {raw}")]
    InvalidImageUrl { question: QuestionId, raw: String },

    #[error("duplicate question id {0}")]
    DuplicateQuestion(QuestionId),

    #[error("duplicate option id {option} in question {question}")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },

    #[error("unknown question kind: {0}")]
    UnknownKind(String),
}

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// How a question is answered and whether it is scored automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    ImageBased,
    OpenEnded,
}

impl QuestionKind {
    /// Open-ended questions are never scored automatically.
    #[must_use]
    pub fn is_scoreable(self) -> bool {
        !matches!(self, Self::OpenEnded)
    }

    #[must_use]
    pub fn has_options(self) -> bool {
        self.is_scoreable()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple-choice",
            Self::ImageBased => "image-based",
            Self::OpenEnded => "open-ended",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple-choice" => Ok(Self::MultipleChoice),
            "image-based" => Ok(Self::ImageBased),
            "open-ended" => Ok(Self::OpenEnded),
            other => Err(QuizError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    id: OptionId,
    text: String,
    is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn id(&self) -> OptionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDraft {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

impl OptionDraft {
    pub fn new(id: u64, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: OptionId::new(id),
            text: text.into(),
            is_correct,
        }
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    text: String,
    image_url: Option<Url>,
    options: Vec<AnswerOption>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&Url> {
        self.image_url.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn is_scoreable(&self) -> bool {
        self.kind.is_scoreable()
    }

    /// The single option flagged correct, if this question has options.
    #[must_use]
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Unvalidated question as entered by an author or read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub text: String,
    pub image_url: Option<String>,
    pub options: Vec<OptionDraft>,
}

impl QuestionDraft {
    pub fn multiple_choice(id: u64, text: impl Into<String>, options: Vec<OptionDraft>) -> Self {
        Self {
            id: QuestionId::new(id),
            kind: QuestionKind::MultipleChoice,
            text: text.into(),
            image_url: None,
            options,
        }
    }

    pub fn image_based(
        id: u64,
        text: impl Into<String>,
        image_url: impl Into<String>,
        options: Vec<OptionDraft>,
    ) -> Self {
        Self {
            id: QuestionId::new(id),
            kind: QuestionKind::ImageBased,
            text: text.into(),
            image_url: Some(image_url.into()),
            options,
        }
    }

    pub fn open_ended(id: u64, text: impl Into<String>) -> Self {
        Self {
            id: QuestionId::new(id),
            kind: QuestionKind::OpenEnded,
            text: text.into(),
            image_url: None,
            options: Vec::new(),
        }
    }

    /// Check the kind-specific shape of the question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the text is blank, the options do not fit the
    /// kind, or the correct-option count is not exactly one.
    pub fn validate(self) -> Result<Question, QuizError> {
        let question = self.id;
        if self.text.trim().is_empty() {
            return Err(QuizError::EmptyQuestionText { question });
        }

        let image_url = match (self.kind, self.image_url) {
            (QuestionKind::ImageBased, Some(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(QuizError::MissingImage { question });
                }
                Some(
                    Url::parse(trimmed)
                        .map_err(|_| QuizError::InvalidImageUrl { question, raw })?,
                )
            }
            (QuestionKind::ImageBased, None) => return Err(QuizError::MissingImage { question }),
            (_, Some(raw)) if !raw.trim().is_empty() => {
                return Err(QuizError::UnexpectedImage { question });
            }
            (_, _) => None,
        };

        if !self.kind.has_options() {
            if !self.options.is_empty() {
                return Err(QuizError::UnexpectedOptions { question });
            }
            return Ok(Question {
                id: question,
                kind: self.kind,
                text: self.text,
                image_url,
                options: Vec::new(),
            });
        }

        if self.options.is_empty() {
            return Err(QuizError::MissingOptions { question });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if !seen.insert(option.id) {
                return Err(QuizError::DuplicateOption {
                    question,
                    option: option.id,
                });
            }
            if option.text.trim().is_empty() {
                return Err(QuizError::EmptyOptionText {
                    question,
                    option: option.id,
                });
            }
        }

        match self.options.iter().filter(|o| o.is_correct).count() {
            0 => return Err(QuizError::NoCorrectOption { question }),
            1 => {}
            count => return Err(QuizError::MultipleCorrectOptions { question, count }),
        }

        let options = self
            .options
            .into_iter()
            .map(|o| AnswerOption {
                id: o.id,
                text: o.text,
                is_correct: o.is_correct,
            })
            .collect();

        Ok(Question {
            id: question,
            kind: self.kind,
            text: self.text,
            image_url,
            options,
        })
    }
}

//
// ─── TESTS (QUIZZES) ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDraft {
    pub title: String,
    pub description: String,
    pub created_by: String,
    pub questions: Vec<QuestionDraft>,
}

impl TestDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            created_by: created_by.into(),
            questions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_question(mut self, question: QuestionDraft) -> Self {
        self.questions.push(question);
        self
    }

    /// Validate the test and every question in order.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizError` found.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedTest, QuizError> {
        if self.title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        let questions = self
            .questions
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        ensure_unique_questions(&questions)?;

        Ok(ValidatedTest {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            created_by: self.created_by,
            created_at: now,
            questions,
        })
    }
}

fn ensure_unique_questions(questions: &[Question]) -> Result<(), QuizError> {
    let mut seen = HashSet::with_capacity(questions.len());
    for q in questions {
        if !seen.insert(q.id) {
            return Err(QuizError::DuplicateQuestion(q.id));
        }
    }
    Ok(())
}

/// A test that passed validation but has no storage id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTest {
    pub title: String,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl ValidatedTest {
    #[must_use]
    pub fn assign_id(self, id: TestId) -> Test {
        Test {
            id,
            title: self.title,
            description: self.description,
            created_by: self.created_by,
            created_at: self.created_at,
            questions: self.questions,
        }
    }
}

/// A quiz: ordered questions plus authoring metadata.
///
/// A `Test` may legitimately have no questions (listings only carry the
/// header); sessions refuse to start on such a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    id: TestId,
    title: String,
    description: String,
    created_by: String,
    created_at: DateTime<Utc>,
    questions: Vec<Question>,
}

impl Test {
    /// Rehydrate a test from already-validated questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` or `QuizError::DuplicateQuestion`.
    pub fn from_persisted(
        id: TestId,
        title: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        ensure_unique_questions(&questions)?;
        Ok(Self {
            id,
            title,
            description: description.into(),
            created_by: created_by.into(),
            created_at,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> TestId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Number of questions eligible for automatic scoring.
    #[must_use]
    pub fn scoreable_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_scoreable()).count()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
