use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::PostId;

/// Longest accepted post body, in characters.
pub const MAX_POST_CHARS: usize = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PostError {
    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("post content cannot be empty")]
    EmptyContent,

    #[error("post is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub username: String,
    pub content: String,
}

impl PostDraft {
    pub fn new(username: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            content: content.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `PostError` if either field is blank after trimming or the
    /// content exceeds `MAX_POST_CHARS`.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewPost, PostError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(PostError::EmptyUsername);
        }
        let content = self.content.trim();
        if content.is_empty() {
            return Err(PostError::EmptyContent);
        }
        let len = content.chars().count();
        if len > MAX_POST_CHARS {
            return Err(PostError::TooLong {
                len,
                max: MAX_POST_CHARS,
            });
        }
        Ok(NewPost {
            username: username.to_owned(),
            content: content.to_owned(),
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    #[must_use]
    pub fn assign_id(self, id: PostId) -> ForumPost {
        ForumPost {
            id,
            username: self.username,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: PostId,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn post_is_trimmed() {
        let post = PostDraft::new(" hiker ", "  lovely weather today \n")
            .validate(fixed_now())
            .unwrap()
            .assign_id(PostId::new(1));
        assert_eq!(post.username, "hiker");
        assert_eq!(post.content, "lovely weather today");
        assert_eq!(post.created_at, fixed_now());
    }

    #[test]
    fn blank_posts_are_rejected() {
        assert_eq!(
            PostDraft::new(" ", "hi").validate(fixed_now()),
            Err(PostError::EmptyUsername)
        );
        assert_eq!(
            PostDraft::new("hiker", "\t").validate(fixed_now()),
            Err(PostError::EmptyContent)
        );
    }

    #[test]
    fn overlong_posts_are_rejected() {
        let body = "ç".repeat(MAX_POST_CHARS + 1);
        let err = PostDraft::new("hiker", body).validate(fixed_now()).unwrap_err();
        assert_eq!(
            err,
            PostError::TooLong {
                len: MAX_POST_CHARS + 1,
                max: MAX_POST_CHARS
            }
        );
    }
}
