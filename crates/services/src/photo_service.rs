use std::sync::Arc;

use cardak_core::model::{Photo, PhotoDraft, PhotoId};
use storage::repository::{AssetStore, PhotoRepository};

use crate::Clock;
use crate::assets::sanitize_file_name;
use crate::error::PhotoServiceError;

pub const PHOTO_BUCKET: &str = "photos";

/// Shared photo gallery.
#[derive(Clone)]
pub struct PhotoService {
    clock: Clock,
    photos: Arc<dyn PhotoRepository>,
    assets: Arc<dyn AssetStore>,
}

impl PhotoService {
    #[must_use]
    pub fn new(clock: Clock, photos: Arc<dyn PhotoRepository>, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            clock,
            photos,
            assets,
        }
    }

    /// All photos, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PhotoServiceError::Storage` if repository access fails.
    pub async fn list_photos(&self) -> Result<Vec<Photo>, PhotoServiceError> {
        Ok(self.photos.list_photos(u32::MAX).await?)
    }

    /// Upload the image, then store its metadata with zero likes.
    ///
    /// The draft is checked before any bytes are written.
    ///
    /// # Errors
    ///
    /// Returns `PhotoServiceError::Photo` for a blank title or uploader,
    /// `PhotoServiceError::Asset` for an unusable file name and
    /// `PhotoServiceError::Storage` if the upload or insert fails.
    pub async fn upload_photo(
        &self,
        draft: PhotoDraft,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Photo, PhotoServiceError> {
        draft.check()?;
        let file_name = sanitize_file_name(file_name)?;
        let now = self.clock.now();
        let path = format!("{}-{file_name}", now.timestamp_millis());

        let url = self.assets.upload_asset(PHOTO_BUCKET, &path, bytes).await?;
        let photo = draft.validate(url, now)?;
        let id = self.photos.insert_photo(&photo).await?;
        tracing::info!(photo_id = %id, url = %photo.url, "photo uploaded");
        Ok(photo.assign_id(id))
    }

    /// Add one like and return the new count.
    ///
    /// # Errors
    ///
    /// Returns `PhotoServiceError::Storage` (`NotFound` for unknown ids).
    pub async fn like_photo(&self, id: PhotoId) -> Result<u32, PhotoServiceError> {
        Ok(self.photos.like_photo(id).await?)
    }
}
