use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::answer::{AnswerSheet, Response};
use crate::model::ids::{QuestionId, TestId};
use crate::scoring::{QuestionVerdict, Score, ScoreReport, Verdict, percent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct count ({correct}) exceeds scoreable count ({scoreable})")]
    CountMismatch { correct: u32, scoreable: u32 },

    #[error("stored score {stored} does not match counts (expected {expected})")]
    ScoreMismatch { stored: Score, expected: Score },
}

/// One graded line of a persisted result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_id: QuestionId,
    pub response: Option<Response>,
    pub verdict: Verdict,
}

/// Persistable record of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    test_id: TestId,
    score: Score,
    correct: u32,
    scoreable: u32,
    answers: Vec<GradedAnswer>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl TestResult {
    /// Build a result from a score report and the answers given.
    ///
    /// # Errors
    ///
    /// Returns `TestResultError::InvalidTimeRange` if `completed_at` is before `started_at`.
    pub fn from_report(
        test_id: TestId,
        report: &ScoreReport,
        answers: &AnswerSheet,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, TestResultError> {
        let graded = report
            .verdicts
            .iter()
            .map(|QuestionVerdict { question_id, verdict }| GradedAnswer {
                question_id: *question_id,
                response: answers.get(question_id).map(|a| a.response.clone()),
                verdict: *verdict,
            })
            .collect();

        Self::from_persisted(
            test_id,
            report.score,
            report.correct,
            report.scoreable,
            graded,
            started_at,
            completed_at,
        )
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TestResultError` if timestamps or counts are inconsistent.
    pub fn from_persisted(
        test_id: TestId,
        score: Score,
        correct: u32,
        scoreable: u32,
        answers: Vec<GradedAnswer>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, TestResultError> {
        if completed_at < started_at {
            return Err(TestResultError::InvalidTimeRange);
        }
        if correct > scoreable {
            return Err(TestResultError::CountMismatch { correct, scoreable });
        }
        let expected = percent(correct, scoreable);
        if expected != score {
            return Err(TestResultError::ScoreMismatch {
                stored: score,
                expected,
            });
        }

        Ok(Self {
            test_id,
            score,
            correct,
            scoreable,
            answers,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn scoreable(&self) -> u32 {
        self.scoreable
    }

    #[must_use]
    pub fn answers(&self) -> &[GradedAnswer] {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, OptionId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn report() -> ScoreReport {
        ScoreReport {
            score: Score::Percent(50),
            correct: 1,
            scoreable: 2,
            verdicts: vec![
                QuestionVerdict {
                    question_id: QuestionId::new(1),
                    verdict: Verdict::Correct,
                },
                QuestionVerdict {
                    question_id: QuestionId::new(2),
                    verdict: Verdict::Unanswered,
                },
            ],
        }
    }

    #[test]
    fn result_keeps_given_responses() {
        let mut sheet = AnswerSheet::new();
        let q1 = QuestionId::new(1);
        sheet.insert(q1, Answer::new(q1, Response::Choice(OptionId::new(4))));

        let now = fixed_now();
        let result = TestResult::from_report(
            TestId::new(3),
            &report(),
            &sheet,
            now,
            now + Duration::minutes(2),
        )
        .unwrap();

        assert_eq!(result.score(), Score::Percent(50));
        assert_eq!(result.answers().len(), 2);
        assert_eq!(
            result.answers()[0].response,
            Some(Response::Choice(OptionId::new(4)))
        );
        assert_eq!(result.answers()[1].response, None);
    }

    #[test]
    fn rejects_reversed_time_range() {
        let now = fixed_now();
        let err = TestResult::from_report(
            TestId::new(3),
            &report(),
            &AnswerSheet::new(),
            now,
            now - Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, TestResultError::InvalidTimeRange);
    }

    #[test]
    fn rejects_inconsistent_persisted_counts() {
        let now = fixed_now();
        let err =
            TestResult::from_persisted(TestId::new(1), Score::Percent(100), 3, 2, Vec::new(), now, now)
                .unwrap_err();
        assert!(matches!(err, TestResultError::CountMismatch { .. }));

        let err =
            TestResult::from_persisted(TestId::new(1), Score::Percent(90), 1, 2, Vec::new(), now, now)
                .unwrap_err();
        assert!(matches!(err, TestResultError::ScoreMismatch { .. }));
    }
}
