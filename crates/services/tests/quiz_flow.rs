use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cardak_core::model::{
    OptionDraft, OptionId, QuestionDraft, QuestionId, Response, ResultId, TestDraft, TestId,
    TestResult,
};
use cardak_core::scoring::Score;
use cardak_core::time::fixed_now;
use services::{Advance, Clock, QuizLoopService, SessionError};
use storage::repository::{
    InMemoryRepository, ResultRepository, StorageError, TestRepository, TestResultRow,
};

async fn seed_test(repo: &InMemoryRepository) -> TestId {
    let draft = TestDraft::new("General Culture", "", "admin")
        .with_question(QuestionDraft::multiple_choice(
            1,
            "Capital of Türkiye?",
            vec![
                OptionDraft::new(1, "Istanbul", false),
                OptionDraft::new(2, "Ankara", true),
            ],
        ))
        .with_question(QuestionDraft::open_ended(2, "Best known theory?"))
        .with_question(QuestionDraft::multiple_choice(
            3,
            "Not a planet?",
            vec![OptionDraft::new(1, "Mars", false), OptionDraft::new(2, "Pluto", true)],
        ));
    repo.insert_test(&draft.validate(fixed_now()).unwrap())
        .await
        .unwrap()
}

fn loop_over(repo: &InMemoryRepository, results: Arc<dyn ResultRepository>) -> QuizLoopService {
    QuizLoopService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()), results)
}

#[tokio::test]
async fn completed_session_persists_one_result() {
    let repo = InMemoryRepository::new();
    let test_id = seed_test(&repo).await;
    let loop_svc = loop_over(&repo, Arc::new(repo.clone()));

    let mut session = loop_svc.start_session(test_id).await.unwrap();
    session
        .record_answer(QuestionId::new(1), Response::Choice(OptionId::new(2)))
        .unwrap();
    session
        .record_answer(QuestionId::new(2), Response::Text("relativity".into()))
        .unwrap();
    session
        .record_answer(QuestionId::new(3), Response::Choice(OptionId::new(1)))
        .unwrap();

    let mut result_id = None;
    while !session.is_complete() {
        let step = loop_svc.advance(&mut session).await.unwrap();
        result_id = step.result_id;
    }
    let result_id = result_id.expect("result persisted on completion");
    assert_eq!(session.score().unwrap(), Score::Percent(50));

    // further advances neither rescore nor persist again
    let again = loop_svc.advance(&mut session).await.unwrap();
    assert!(matches!(again.step, Advance::AlreadyCompleted { .. }));
    assert_eq!(again.result_id, Some(result_id));

    let history = loop_svc.history(test_id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, result_id);
    assert_eq!(history[0].result.correct(), 1);
    assert_eq!(history[0].result.scoreable(), 2);
}

#[tokio::test]
async fn restart_allows_a_second_attempt() {
    let repo = InMemoryRepository::new();
    let test_id = seed_test(&repo).await;
    let loop_svc = loop_over(&repo, Arc::new(repo.clone()));

    let mut session = loop_svc.start_session(test_id).await.unwrap();
    while !session.is_complete() {
        loop_svc.advance(&mut session).await.unwrap();
    }
    assert_eq!(session.score().unwrap(), Score::Percent(0));

    loop_svc.restart(&mut session);
    assert!(matches!(session.score(), Err(SessionError::InvalidState { .. })));
    assert_eq!(session.current_index(), 0);

    session
        .answer_current(Response::Choice(OptionId::new(2)))
        .unwrap();
    while !session.is_complete() {
        loop_svc.advance(&mut session).await.unwrap();
    }

    let history = loop_svc.history(test_id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn missing_test_surfaces_storage_error() {
    let repo = InMemoryRepository::new();
    let loop_svc = loop_over(&repo, Arc::new(repo.clone()));

    let err = loop_svc.start_session(TestId::new(404)).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(StorageError::NotFound)));
}

#[tokio::test]
async fn test_without_questions_cannot_start() {
    let repo = InMemoryRepository::new();
    let empty = TestDraft::new("Draft", "", "admin")
        .validate(fixed_now())
        .unwrap();
    let test_id = repo.insert_test(&empty).await.unwrap();
    let loop_svc = loop_over(&repo, Arc::new(repo.clone()));

    let err = loop_svc.start_session(test_id).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTest));
}

/// Result store that fails until told otherwise.
struct FlakyResults {
    inner: InMemoryRepository,
    failing: AtomicBool,
    appends: AtomicUsize,
}

#[async_trait]
impl ResultRepository for FlakyResults {
    async fn append_result(&self, result: &TestResult) -> Result<ResultId, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("database is locked".into()));
        }
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append_result(result).await
    }

    async fn get_result(&self, id: ResultId) -> Result<TestResult, StorageError> {
        self.inner.get_result(id).await
    }

    async fn list_results(
        &self,
        test_id: TestId,
        limit: u32,
    ) -> Result<Vec<TestResultRow>, StorageError> {
        self.inner.list_results(test_id, limit).await
    }
}

#[tokio::test]
async fn failed_append_can_be_finalized_later() {
    let repo = InMemoryRepository::new();
    let test_id = seed_test(&repo).await;
    let flaky = Arc::new(FlakyResults {
        inner: repo.clone(),
        failing: AtomicBool::new(true),
        appends: AtomicUsize::new(0),
    });
    let loop_svc = loop_over(&repo, flaky.clone());

    let mut session = loop_svc.start_session(test_id).await.unwrap();
    loop_svc.advance(&mut session).await.unwrap();
    loop_svc.advance(&mut session).await.unwrap();
    let err = loop_svc.advance(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::Storage(StorageError::Connection(_))));
    assert!(session.is_complete());
    assert!(session.result_id().is_none());

    flaky.failing.store(false, Ordering::SeqCst);
    let id = loop_svc.finalize_result(&mut session).await.unwrap();
    assert_eq!(session.result_id(), Some(id));

    // idempotent once persisted
    assert_eq!(loop_svc.finalize_result(&mut session).await.unwrap(), id);
    loop_svc.advance(&mut session).await.unwrap();
    assert_eq!(flaky.appends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn finalize_requires_completed_session() {
    let repo = InMemoryRepository::new();
    let test_id = seed_test(&repo).await;
    let loop_svc = loop_over(&repo, Arc::new(repo.clone()));

    let mut session = loop_svc.start_session(test_id).await.unwrap();
    let err = loop_svc.finalize_result(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidState { .. }));
}
