use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardak_core::model::{
    Answer, AnswerSheet, Question, QuestionId, Response, ResultId, Test, TestResult,
};
use cardak_core::scoring::{self, Score, ScoreReport};

use super::progress::{Phase, SessionProgress};
use crate::error::SessionError;

//
// ─── STEP OUTCOME ──────────────────────────────────────────────────────────────
//

/// What a call to [`QuizSession::advance`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the question at `index`.
    Moved { index: usize },
    /// Left the last question; the attempt is now graded.
    Completed { report: ScoreReport },
    /// The session was already completed; nothing changed.
    AlreadyCompleted { report: ScoreReport },
}

impl Advance {
    #[must_use]
    pub fn report(&self) -> Option<&ScoreReport> {
        match self {
            Self::Moved { .. } => None,
            Self::Completed { report } | Self::AlreadyCompleted { report } => Some(report),
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's walk through a test.
///
/// The session owns its copy of the test, so it can be serialized and resumed
/// without touching storage. Timestamps are passed in by the caller to keep the
/// engine free of clocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    test: Test,
    answers: AnswerSheet,
    current: usize,
    phase: Phase,
    report: Option<ScoreReport>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    result_id: Option<ResultId>,
}

impl QuizSession {
    /// Start a session on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTest` if the test has no questions.
    pub fn start(test: Test, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if test.questions().is_empty() {
            return Err(SessionError::InvalidTest);
        }

        Ok(Self {
            test,
            answers: AnswerSheet::new(),
            current: 0,
            phase: Phase::InProgress,
            report: None,
            started_at,
            completed_at: None,
            result_id: None,
        })
    }

    #[must_use]
    pub fn test(&self) -> &Test {
        &self.test
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn result_id(&self) -> Option<ResultId> {
        self.result_id
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// Question on screen, or `None` once completed.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::InProgress => self.test.questions().get(self.current),
            Phase::Completed => None,
        }
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            current_index: self.current,
            total: self.test.questions().len(),
            answered: self.answers.len(),
            is_complete: self.is_complete(),
        }
    }

    /// Record (or replace) the answer for a question. Does not move.
    ///
    /// Returns the answer that was replaced, if any. Selected option ids are
    /// stored as given; an id that matches no option simply grades as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` once completed,
    /// `SessionError::UnknownQuestion` for a question outside the test and
    /// `SessionError::AnswerMismatch` when the response shape does not fit the
    /// question kind.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        response: Response,
    ) -> Result<Option<Answer>, SessionError> {
        self.ensure_in_progress()?;
        let question = self
            .test
            .question(question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;
        if !response.fits(question.kind()) {
            return Err(SessionError::AnswerMismatch {
                question: question_id,
                kind: question.kind(),
            });
        }

        Ok(self
            .answers
            .insert(question_id, Answer::new(question_id, response)))
    }

    /// Record an answer for the question on screen.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::record_answer`].
    pub fn answer_current(&mut self, response: Response) -> Result<Option<Answer>, SessionError> {
        let question_id = self
            .current_question()
            .map(Question::id)
            .ok_or(SessionError::InvalidState { phase: self.phase })?;
        self.record_answer(question_id, response)
    }

    /// Move forward; leaving the last question completes and grades the attempt.
    ///
    /// On a completed session this is a no-op returning the existing report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if a completed session lost its report,
    /// which only happens with hand-edited serialized state.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        if self.is_complete() {
            let report = self
                .report
                .clone()
                .ok_or(SessionError::InvalidState { phase: self.phase })?;
            return Ok(Advance::AlreadyCompleted { report });
        }

        let last = self.test.questions().len().saturating_sub(1);
        if self.current < last {
            self.current += 1;
            return Ok(Advance::Moved {
                index: self.current,
            });
        }

        let report = scoring::grade(&self.test, &self.answers);
        self.phase = Phase::Completed;
        self.completed_at = Some(now.max(self.started_at));
        self.report = Some(report.clone());
        Ok(Advance::Completed { report })
    }

    /// Step back one question; stays put on the first one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` once completed.
    pub fn retreat(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.current = self.current.saturating_sub(1);
        Ok(self.current)
    }

    /// Reset to a fresh attempt on the same test.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.answers.clear();
        self.current = 0;
        self.phase = Phase::InProgress;
        self.report = None;
        self.started_at = now;
        self.completed_at = None;
        self.result_id = None;
    }

    /// Score of a completed attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` while in progress.
    pub fn score(&self) -> Result<Score, SessionError> {
        self.report()
            .map(|r| r.score)
            .ok_or(SessionError::InvalidState { phase: self.phase })
    }

    /// Full grading, available once completed.
    #[must_use]
    pub fn report(&self) -> Option<&ScoreReport> {
        match self.phase {
            Phase::Completed => self.report.as_ref(),
            Phase::InProgress => None,
        }
    }

    pub(crate) fn build_result(&self) -> Result<TestResult, SessionError> {
        let invalid = SessionError::InvalidState { phase: self.phase };
        let (Some(report), Some(completed_at)) = (self.report(), self.completed_at) else {
            return Err(invalid);
        };
        Ok(TestResult::from_report(
            self.test.id(),
            report,
            &self.answers,
            self.started_at,
            completed_at,
        )?)
    }

    pub(crate) fn set_result_id(&mut self, id: ResultId) {
        self.result_id = Some(id);
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::InProgress => Ok(()),
            Phase::Completed => Err(SessionError::InvalidState { phase: self.phase }),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use cardak_core::model::{OptionDraft, OptionId, QuestionDraft, QuestionKind, TestDraft, TestId};
    use cardak_core::time::fixed_now;
    use chrono::Duration;

    fn build_test(questions: Vec<QuestionDraft>) -> Test {
        questions
            .into_iter()
            .fold(TestDraft::new("Culture", "", "admin"), TestDraft::with_question)
            .validate(fixed_now())
            .unwrap()
            .assign_id(TestId::new(1))
    }

    fn capital(id: u64) -> QuestionDraft {
        QuestionDraft::multiple_choice(
            id,
            "Capital?",
            vec![OptionDraft::new(1, "Istanbul", false), OptionDraft::new(2, "Ankara", true)],
        )
    }

    fn three_questions() -> Test {
        build_test(vec![
            capital(1),
            QuestionDraft::open_ended(2, "Theory?"),
            QuestionDraft::image_based(
                3,
                "Animal?",
                "https://img.example/fox.jpg",
                vec![OptionDraft::new(1, "Wolf", false), OptionDraft::new(2, "Fox", true)],
            ),
        ])
    }

    fn choice(id: u64) -> Response {
        Response::Choice(OptionId::new(id))
    }

    fn finish(session: &mut QuizSession) -> ScoreReport {
        loop {
            match session.advance(fixed_now()).unwrap() {
                Advance::Moved { .. } => {}
                Advance::Completed { report } | Advance::AlreadyCompleted { report } => {
                    return report;
                }
            }
        }
    }

    #[test]
    fn start_rejects_empty_test() {
        let err = QuizSession::start(build_test(Vec::new()), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTest));
    }

    #[test]
    fn start_points_at_first_question() {
        let session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.current_question().unwrap().id(), QuestionId::new(1));
        assert!(session.answers().is_empty());
        assert_eq!(
            session.progress(),
            SessionProgress {
                current_index: 0,
                total: 3,
                answered: 0,
                is_complete: false,
            }
        );
    }

    #[test]
    fn recording_replaces_previous_answer_without_moving() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        let q1 = QuestionId::new(1);

        assert!(session.record_answer(q1, choice(1)).unwrap().is_none());
        let replaced = session.record_answer(q1, choice(2)).unwrap().unwrap();
        assert_eq!(replaced.selected_option_id(), Some(OptionId::new(1)));

        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.answer_for(q1).unwrap().selected_option_id(), Some(OptionId::new(2)));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn answers_can_target_any_question() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        session.record_answer(QuestionId::new(3), choice(2)).unwrap();
        assert_eq!(session.current_index(), 0);
        assert!(session.answer_for(QuestionId::new(3)).is_some());
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        let err = session.record_answer(QuestionId::new(42), choice(1)).unwrap_err();
        assert!(matches!(err, SessionError::UnknownQuestion(id) if id == QuestionId::new(42)));
    }

    #[test]
    fn mismatched_response_is_rejected() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        let err = session
            .record_answer(QuestionId::new(1), Response::Text("Ankara".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::AnswerMismatch { kind: QuestionKind::MultipleChoice, .. }
        ));

        let err = session.record_answer(QuestionId::new(2), choice(1)).unwrap_err();
        assert!(matches!(err, SessionError::AnswerMismatch { .. }));
    }

    #[test]
    fn unknown_option_is_stored_and_graded_incorrect() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        session.record_answer(QuestionId::new(1), choice(99)).unwrap();
        let report = finish(&mut session);
        assert_eq!(report.correct, 0);
    }

    #[test]
    fn retreat_stops_at_first_question() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        assert_eq!(session.retreat().unwrap(), 0);
        session.advance(fixed_now()).unwrap();
        assert_eq!(session.retreat().unwrap(), 0);
    }

    #[test]
    fn advance_walks_then_completes_on_last() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        assert_eq!(session.advance(fixed_now()).unwrap(), Advance::Moved { index: 1 });
        assert_eq!(session.advance(fixed_now()).unwrap(), Advance::Moved { index: 2 });

        let done_at = fixed_now() + Duration::minutes(3);
        let step = session.advance(done_at).unwrap();
        assert!(matches!(step, Advance::Completed { .. }));
        assert!(session.is_complete());
        assert!(session.current_question().is_none());
        assert_eq!(session.completed_at(), Some(done_at));
        // index stays in range after completion
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn single_question_completes_on_first_advance() {
        let mut session = QuizSession::start(build_test(vec![capital(1)]), fixed_now()).unwrap();
        session.answer_current(choice(2)).unwrap();
        let step = session.advance(fixed_now()).unwrap();
        assert_eq!(step.report().unwrap().score, Score::Percent(100));
    }

    #[test]
    fn advance_after_completion_keeps_report() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        session.record_answer(QuestionId::new(1), choice(2)).unwrap();
        let first = finish(&mut session);
        let again = session.advance(fixed_now() + Duration::hours(1)).unwrap();
        assert_eq!(again, Advance::AlreadyCompleted { report: first });
        assert_eq!(session.completed_at(), Some(fixed_now()));
    }

    #[test]
    fn completed_session_rejects_mutation() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        finish(&mut session);

        let err = session.record_answer(QuestionId::new(1), choice(2)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { phase: Phase::Completed }));
        assert!(matches!(session.retreat(), Err(SessionError::InvalidState { .. })));
        assert!(matches!(
            session.answer_current(choice(2)),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[test]
    fn score_counts_only_scoreable_questions() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        session.record_answer(QuestionId::new(1), choice(2)).unwrap();
        session
            .record_answer(QuestionId::new(2), Response::Text("relativity".into()))
            .unwrap();
        session.record_answer(QuestionId::new(3), choice(1)).unwrap();
        finish(&mut session);

        assert_eq!(session.score().unwrap(), Score::Percent(50));
    }

    #[test]
    fn score_before_completion_is_invalid() {
        let session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        assert!(matches!(
            session.score(),
            Err(SessionError::InvalidState { phase: Phase::InProgress })
        ));
    }

    #[test]
    fn open_ended_only_test_is_not_applicable() {
        let test = build_test(vec![QuestionDraft::open_ended(1, "Why?")]);
        let mut session = QuizSession::start(test, fixed_now()).unwrap();
        session.answer_current(Response::Text("because".into())).unwrap();
        finish(&mut session);
        assert_eq!(session.score().unwrap(), Score::NotApplicable);
    }

    #[test]
    fn restart_returns_to_fresh_attempt() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        session.record_answer(QuestionId::new(1), choice(2)).unwrap();
        finish(&mut session);
        session.set_result_id(ResultId::new(5));

        let later = fixed_now() + Duration::days(1);
        session.restart(later);

        assert_eq!(session.current_index(), 0);
        assert!(session.answers().is_empty());
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.started_at(), later);
        assert!(session.result_id().is_none());
        assert!(matches!(session.score(), Err(SessionError::InvalidState { .. })));
    }

    #[test]
    fn build_result_requires_completion() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        assert!(matches!(session.build_result(), Err(SessionError::InvalidState { .. })));

        session.record_answer(QuestionId::new(3), choice(2)).unwrap();
        finish(&mut session);
        let result = session.build_result().unwrap();
        assert_eq!(result.test_id(), TestId::new(1));
        assert_eq!(result.correct(), 1);
        assert_eq!(result.scoreable(), 2);
    }

    #[test]
    fn session_survives_json_roundtrip() {
        let mut session = QuizSession::start(three_questions(), fixed_now()).unwrap();
        session.record_answer(QuestionId::new(1), choice(2)).unwrap();
        session.advance(fixed_now()).unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let restored: QuizSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.current_index(), 1);
    }
}
