use std::sync::Arc;

use cardak_core::model::{ResultId, TestId};
use storage::repository::{ResultRepository, TestRepository, TestResultRow};

use super::service::{Advance, QuizSession};
use crate::Clock;
use crate::error::SessionError;

/// Result of one `advance` through the quiz loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStepResult {
    pub step: Advance,
    pub is_complete: bool,
    pub result_id: Option<ResultId>,
}

/// Orchestrates session start and result persistence.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    tests: Arc<dyn TestRepository>,
    results: Arc<dyn ResultRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        tests: Arc<dyn TestRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            clock,
            tests,
            results,
        }
    }

    /// Fetch a test and start a session on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the test cannot be loaded and
    /// `SessionError::InvalidTest` if it has no questions.
    pub async fn start_session(&self, test_id: TestId) -> Result<QuizSession, SessionError> {
        let test = self.tests.get_test(test_id).await?;
        let session = QuizSession::start(test, self.clock.now())?;
        tracing::debug!(%test_id, questions = session.progress().total, "quiz session started");
        Ok(session)
    }

    /// Advance the session and persist its result on the completing step.
    ///
    /// The result is appended exactly once: a session that already carries a
    /// result id is never written again. If the append fails the session stays
    /// completed and [`QuizLoopService::finalize_result`] can retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for engine or persistence failures.
    pub async fn advance(&self, session: &mut QuizSession) -> Result<SessionStepResult, SessionError> {
        let step = session.advance(self.clock.now())?;

        if matches!(step, Advance::Completed { .. }) && session.result_id().is_none() {
            self.persist(session).await?;
        }

        Ok(SessionStepResult {
            step,
            is_complete: session.is_complete(),
            result_id: session.result_id(),
        })
    }

    /// Retry result persistence for a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the session is not complete.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize_result(&self, session: &mut QuizSession) -> Result<ResultId, SessionError> {
        if let Some(id) = session.result_id() {
            return Ok(id);
        }
        self.persist(session).await
    }

    /// Start a fresh attempt on the same test.
    pub fn restart(&self, session: &mut QuizSession) {
        session.restart(self.clock.now());
    }

    /// Persisted results for a test, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on backend failures.
    pub async fn history(
        &self,
        test_id: TestId,
        limit: u32,
    ) -> Result<Vec<TestResultRow>, SessionError> {
        Ok(self.results.list_results(test_id, limit).await?)
    }

    async fn persist(&self, session: &mut QuizSession) -> Result<ResultId, SessionError> {
        let result = session.build_result()?;
        let id = match self.results.append_result(&result).await {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(test_id = %result.test_id(), error = %err, "result append failed");
                return Err(err.into());
            }
        };
        session.set_result_id(id);
        tracing::info!(
            test_id = %result.test_id(),
            result_id = %id,
            score = %result.score(),
            "quiz result saved"
        );
        Ok(id)
    }
}
