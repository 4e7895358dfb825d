use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::UserSummary;

/// Kanban column of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Not started yet.
    #[default]
    ToDo,
    /// Being worked on.
    InProgress,
    /// Waiting for the reviewer.
    Review,
    /// Finished.
    Done,
}

/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A task as stored in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Task {
    pub id: i32,
    /// The project the task belongs to. Never changes after creation.
    pub project_id: i32,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Free-form label such as "bug" or "design".
    pub category: Option<String>,
    pub assignee_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    pub due_date: Option<NaiveDate>,
    /// Number of comments, computed when the task is loaded.
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for `POST /api/tasks`.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    pub project: i32,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[validate(length(max = 50))]
    pub category: Option<String>,

    pub assignee_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    pub due_date: Option<NaiveDate>,
}

/// Fields needed to insert a task, already checked by the handler.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: i32,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: Option<String>,
    pub assignee_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    pub due_date: Option<NaiveDate>,
}

impl From<TaskInput> for NewTask {
    fn from(input: TaskInput) -> Self {
        Self {
            project_id: input.project,
            title: input.title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            category: input.category.filter(|c| !c.is_empty()),
            assignee_id: input.assignee_id,
            reviewer_id: input.reviewer_id,
            due_date: input.due_date,
        }
    }
}

/// Payload for `PUT`/`PATCH /api/tasks/{id}`.
///
/// An absent field is left unchanged. `assignee_id`, `reviewer_id` and
/// `due_date` distinguish "absent" from an explicit `null`, which clears them.
/// An empty `category` clears the category.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskUpdate {
    pub project: Option<i32>,

    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[validate(length(max = 50))]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub assignee_id: Option<Option<i32>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub reviewer_id: Option<Option<i32>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,
}

// Present-but-null must become Some(None), which plain Option<Option<T>> can't express.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Task {
    /// Applies the present fields of `update`. The project is not touched.
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(category) = update.category {
            self.category = Some(category).filter(|c| !c.is_empty());
        }
        if let Some(assignee_id) = update.assignee_id {
            self.assignee_id = assignee_id;
        }
        if let Some(reviewer_id) = update.reviewer_id {
            self.reviewer_id = reviewer_id;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = due_date;
        }
    }
}

/// Query parameters accepted by `GET /api/tasks`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project: Option<i32>,
    /// Case-insensitive match against title and description.
    pub search: Option<String>,
}

/// Storage-level task filter. All present conditions must hold.
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    /// Only tasks in projects this user owns or belongs to.
    pub visible_to: Option<i32>,
    pub project_id: Option<i32>,
    pub assignee_id: Option<i32>,
    pub reviewer_id: Option<i32>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search: Option<String>,
}

/// A task as returned by the API, with assignee and reviewer expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: i32,
    pub project: i32,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: Option<String>,
    pub assignee: Option<UserSummary>,
    pub reviewer: Option<UserSummary>,
    pub due_date: Option<NaiveDate>,
    /// Left out of PATCH responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments_count: Option<i64>,
}

impl TaskView {
    pub fn new(task: Task, users: &HashMap<i32, UserSummary>) -> Self {
        let lookup = |id: Option<i32>| id.and_then(|id| users.get(&id).cloned());
        Self {
            id: task.id,
            project: task.project_id,
            assignee: lookup(task.assignee_id),
            reviewer: lookup(task.reviewer_id),
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            category: task.category,
            due_date: task.due_date,
            comments_count: Some(task.comments_count),
        }
    }

    pub fn without_comments_count(mut self) -> Self {
        self.comments_count = None;
        self
    }
}
