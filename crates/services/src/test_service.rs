use std::sync::Arc;

use cardak_core::model::{Test, TestDraft, TestId};
use storage::repository::{AssetStore, TestListing, TestRepository};
use url::Url;

use crate::Clock;
use crate::assets::file_extension;
use crate::error::TestServiceError;

/// Bucket holding images referenced by image-based questions.
pub const TEST_IMAGE_BUCKET: &str = "test-images";

/// Authoring and browsing of tests.
#[derive(Clone)]
pub struct TestService {
    clock: Clock,
    tests: Arc<dyn TestRepository>,
    assets: Arc<dyn AssetStore>,
}

impl TestService {
    #[must_use]
    pub fn new(clock: Clock, tests: Arc<dyn TestRepository>, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            clock,
            tests,
            assets,
        }
    }

    /// All tests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Storage` if repository access fails.
    pub async fn list_tests(&self) -> Result<Vec<TestListing>, TestServiceError> {
        Ok(self.tests.list_tests(u32::MAX).await?)
    }

    /// # Errors
    ///
    /// Returns `TestServiceError::Storage` (`NotFound` for unknown ids).
    pub async fn get_test(&self, id: TestId) -> Result<Test, TestServiceError> {
        Ok(self.tests.get_test(id).await?)
    }

    /// Validate a draft and store it, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Quiz` for validation failures.
    /// Returns `TestServiceError::Storage` if persistence fails.
    pub async fn create_test(&self, draft: TestDraft) -> Result<TestId, TestServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let id = self.tests.insert_test(&validated).await?;
        tracing::info!(test_id = %id, questions = validated.questions.len(), "test created");
        Ok(id)
    }

    /// Upload an image for a test and return its public url.
    ///
    /// Stored as `test-images/{test_id}/{millis}.{ext}`.
    ///
    /// # Errors
    ///
    /// Returns `TestServiceError::Asset` when the file name has no extension.
    /// Returns `TestServiceError::Storage` if the upload fails.
    pub async fn upload_test_image(
        &self,
        bytes: &[u8],
        file_name: &str,
        test_id: TestId,
    ) -> Result<Url, TestServiceError> {
        let ext = file_extension(file_name)?;
        let millis = self.clock.now().timestamp_millis();
        let path = format!("{test_id}/{millis}.{ext}");
        let url = self.assets.upload_asset(TEST_IMAGE_BUCKET, &path, bytes).await?;
        tracing::debug!(%test_id, %url, size = bytes.len(), "test image uploaded");
        Ok(url)
    }
}
