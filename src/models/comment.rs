use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i32,
    pub task_id: i32,
    pub author_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub content: String,
}

impl CommentInput {
    /// Returns the trimmed content, or `None` if nothing is left.
    pub fn content(&self) -> Option<&str> {
        Some(self.content.trim()).filter(|c| !c.is_empty())
    }
}

/// A comment as returned by the API; `author` is the author's full name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i32,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: Comment, author: String) -> Self {
        Self {
            id: comment.id,
            author,
            content: comment.content,
            created_at: comment.created_at,
        }
    }
}
