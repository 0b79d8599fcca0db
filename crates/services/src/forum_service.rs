use std::sync::Arc;

use cardak_core::model::{ForumPost, PostDraft};
use storage::repository::ForumRepository;

use crate::Clock;
use crate::error::ForumServiceError;

/// Number of posts shown on the forum page.
pub const DEFAULT_POST_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct ForumService {
    clock: Clock,
    forum: Arc<dyn ForumRepository>,
}

impl ForumService {
    #[must_use]
    pub fn new(clock: Clock, forum: Arc<dyn ForumRepository>) -> Self {
        Self { clock, forum }
    }

    /// Latest posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::Storage` if repository access fails.
    pub async fn recent_posts(&self, limit: u32) -> Result<Vec<ForumPost>, ForumServiceError> {
        Ok(self.forum.list_posts(limit).await?)
    }

    /// Publish a post stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `ForumServiceError::Post` for blank or oversized posts.
    /// Returns `ForumServiceError::Storage` if persistence fails.
    pub async fn create_post(
        &self,
        username: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<ForumPost, ForumServiceError> {
        let post = PostDraft::new(username, content).validate(self.clock.now())?;
        let id = self.forum.insert_post(&post).await?;
        tracing::info!(post_id = %id, username = %post.username, "forum post created");
        Ok(post.assign_id(id))
    }
}
