use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{AnswerSheet, QuestionId, Test};

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Outcome of automatic scoring.
///
/// A test made only of open-ended questions has nothing to score, which is
/// reported as `NotApplicable` instead of dividing by zero.
///
/// # Examples
///
/// ```
/// # use cardak_core::scoring::{percent, Score};
/// assert_eq!(percent(1, 3), Score::Percent(33));
/// assert_eq!(percent(2, 3), Score::Percent(67));
/// assert_eq!(percent(0, 0), Score::NotApplicable);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Score {
    Percent(u8),
    NotApplicable,
}

impl Score {
    #[must_use]
    pub fn percent(self) -> Option<u8> {
        match self {
            Self::Percent(p) => Some(p),
            Self::NotApplicable => None,
        }
    }

    #[must_use]
    pub fn is_applicable(self) -> bool {
        matches!(self, Self::Percent(_))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{p}%"),
            Self::NotApplicable => f.write_str("n/a"),
        }
    }
}

/// `round(100 * correct / scoreable)` with halves rounded up.
///
/// `correct` is clamped to `scoreable`.
#[must_use]
pub fn percent(correct: u32, scoreable: u32) -> Score {
    if scoreable == 0 {
        return Score::NotApplicable;
    }
    let correct = u64::from(correct.min(scoreable));
    let scoreable = u64::from(scoreable);
    let rounded = (200 * correct + scoreable) / (2 * scoreable);
    Score::Percent(u8::try_from(rounded.min(100)).unwrap_or(100))
}

//
// ─── VERDICTS ──────────────────────────────────────────────────────────────────
//

/// Per-question result shown on the results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    Unanswered,
    /// Open-ended questions are kept but never graded.
    NotScored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionVerdict {
    pub question_id: QuestionId,
    pub verdict: Verdict,
}

/// Full grading of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: Score,
    pub correct: u32,
    pub scoreable: u32,
    /// One entry per question, in test order.
    pub verdicts: Vec<QuestionVerdict>,
}

impl ScoreReport {
    #[must_use]
    pub fn verdict_for(&self, question_id: QuestionId) -> Option<Verdict> {
        self.verdicts
            .iter()
            .find(|v| v.question_id == question_id)
            .map(|v| v.verdict)
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Grade an answer sheet against a test.
///
/// A scoreable question counts as correct when its answer selects the option
/// flagged correct. Selections that match no option are simply incorrect.
#[must_use]
pub fn grade(test: &Test, answers: &AnswerSheet) -> ScoreReport {
    let mut correct = 0_u32;
    let mut scoreable = 0_u32;
    let mut verdicts = Vec::with_capacity(test.questions().len());

    for question in test.questions() {
        let verdict = if question.is_scoreable() {
            scoreable = scoreable.saturating_add(1);
            match answers.get(&question.id()).and_then(|a| a.selected_option_id()) {
                None => Verdict::Unanswered,
                Some(selected) => {
                    let expected = question.correct_option().map(|o| o.id());
                    if expected == Some(selected) {
                        correct = correct.saturating_add(1);
                        Verdict::Correct
                    } else {
                        Verdict::Incorrect
                    }
                }
            }
        } else {
            Verdict::NotScored
        };
        verdicts.push(QuestionVerdict {
            question_id: question.id(),
            verdict,
        });
    }

    ScoreReport {
        score: percent(correct, scoreable),
        correct,
        scoreable,
        verdicts,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
