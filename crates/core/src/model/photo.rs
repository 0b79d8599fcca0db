use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::PhotoId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhotoError {
    #[error("photo title cannot be empty")]
    EmptyTitle,

    #[error("uploader name cannot be empty")]
    EmptyUploader,
}

/// Metadata entered alongside an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDraft {
    pub title: String,
    pub uploaded_by: String,
}

impl PhotoDraft {
    pub fn new(title: impl Into<String>, uploaded_by: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uploaded_by: uploaded_by.into(),
        }
    }

    /// Check the draft without consuming it, e.g. before uploading bytes.
    ///
    /// # Errors
    ///
    /// Returns `PhotoError` if the title or uploader is blank.
    pub fn check(&self) -> Result<(), PhotoError> {
        if self.title.trim().is_empty() {
            return Err(PhotoError::EmptyTitle);
        }
        if self.uploaded_by.trim().is_empty() {
            return Err(PhotoError::EmptyUploader);
        }
        Ok(())
    }

    /// Trim and check the draft, binding it to the uploaded asset url.
    ///
    /// # Errors
    ///
    /// Returns `PhotoError` if the title or uploader is blank.
    pub fn validate(self, url: Url, now: DateTime<Utc>) -> Result<NewPhoto, PhotoError> {
        self.check()?;
        Ok(NewPhoto {
            title: self.title.trim().to_owned(),
            url,
            uploaded_by: self.uploaded_by.trim().to_owned(),
            uploaded_at: now,
        })
    }
}

/// A validated photo that has not been stored yet; starts with zero likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub title: String,
    pub url: Url,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl NewPhoto {
    #[must_use]
    pub fn assign_id(self, id: PhotoId) -> Photo {
        Photo {
            id,
            title: self.title,
            url: self.url,
            uploaded_by: self.uploaded_by,
            uploaded_at: self.uploaded_at,
            likes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub title: String,
    pub url: Url,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub likes: u32,
}

impl Photo {
    pub fn like(&mut self) {
        self.likes = self.likes.saturating_add(1);
    }
}
