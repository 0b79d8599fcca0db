use std::sync::Arc;

use storage::repository::Storage;
use url::Url;

use crate::Clock;
use crate::error::AppServicesError;
use crate::forum_service::ForumService;
use crate::photo_service::PhotoService;
use crate::sessions::QuizLoopService;
use crate::test_service::TestService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz_loop: Arc<QuizLoopService>,
    tests: Arc<TestService>,
    photos: Arc<PhotoService>,
    forum: Arc<ForumService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        asset_base: Url,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, asset_base).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let quiz_loop = Arc::new(QuizLoopService::new(
            clock,
            Arc::clone(&storage.tests),
            Arc::clone(&storage.results),
        ));
        let tests = Arc::new(TestService::new(
            clock,
            Arc::clone(&storage.tests),
            Arc::clone(&storage.assets),
        ));
        let photos = Arc::new(PhotoService::new(
            clock,
            Arc::clone(&storage.photos),
            Arc::clone(&storage.assets),
        ));
        let forum = Arc::new(ForumService::new(clock, Arc::clone(&storage.forum)));

        Self {
            quiz_loop,
            tests,
            photos,
            forum,
        }
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn tests(&self) -> Arc<TestService> {
        Arc::clone(&self.tests)
    }

    #[must_use]
    pub fn photos(&self) -> Arc<PhotoService> {
        Arc::clone(&self.photos)
    }

    #[must_use]
    pub fn forum(&self) -> Arc<ForumService> {
        Arc::clone(&self.forum)
    }
}
