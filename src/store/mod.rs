//! Persistence for users, projects, tasks and comments.
//!
//! Handlers talk to storage through the repository traits below, bundled as
//! [`Store`]. Two implementations exist: [`PgStore`] for PostgreSQL and
//! [`MemoryStore`], which keeps everything in process memory and backs the
//! integration tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Comment, NewTask, NewUser, Project, ProjectStats, Task, TaskFilter, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// A uniqueness rule was violated; the message is safe to show to clients.
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("storage lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

pub const EMAIL_TAKEN: &str = "Email already in use.";
pub const USERNAME_TAKEN: &str = "Username already in use.";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] if the email or username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Returns the users that exist among `ids`, ordered by id.
    async fn find_users(&self, ids: &[i32]) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Creates a project. Member ids that match no user are skipped.
    async fn create_project(
        &self,
        owner_id: i32,
        title: &str,
        members: &[i32],
    ) -> StoreResult<Project>;

    async fn find_project(&self, id: i32) -> StoreResult<Option<Project>>;

    /// Projects the user owns or is a member of, newest first.
    async fn list_projects_for(&self, user_id: i32) -> StoreResult<Vec<Project>>;

    /// Sets the title and/or replaces the member set.
    async fn update_project(
        &self,
        id: i32,
        title: Option<&str>,
        members: Option<&[i32]>,
    ) -> StoreResult<Project>;

    /// Deletes the project with its tasks and their comments.
    /// Returns `false` if it did not exist.
    async fn delete_project(&self, id: i32) -> StoreResult<bool>;

    async fn project_stats(&self, id: i32) -> StoreResult<ProjectStats>;

    /// Counters for several projects in one pass. Ids without tasks map to zeroes.
    async fn stats_for_projects(&self, ids: &[i32]) -> StoreResult<HashMap<i32, ProjectStats>>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    async fn find_task(&self, id: i32) -> StoreResult<Option<Task>>;

    /// Tasks matching every condition of `filter`, newest first.
    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Persists the mutable fields of `task` and returns the stored row.
    async fn update_task(&self, task: &Task) -> StoreResult<Task>;

    /// Deletes the task and its comments. Returns `false` if it did not exist.
    async fn delete_task(&self, id: i32) -> StoreResult<bool>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(
        &self,
        task_id: i32,
        author_id: i32,
        content: &str,
    ) -> StoreResult<Comment>;

    async fn find_comment(&self, id: i32) -> StoreResult<Option<Comment>>;

    /// Comments on the task, oldest first.
    async fn list_comments(&self, task_id: i32) -> StoreResult<Vec<Comment>>;

    async fn delete_comment(&self, id: i32) -> StoreResult<bool>;
}

/// Everything the HTTP layer needs from storage.
pub trait Store: UserRepository + ProjectRepository + TaskRepository + CommentRepository {}

impl<T> Store for T where
    T: UserRepository + ProjectRepository + TaskRepository + CommentRepository
{
}
