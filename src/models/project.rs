use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{TaskView, UserSummary};

/// A Kanban project (a "board" in the frontend).
///
/// The owner is not implicitly part of `members`; access checks consider both.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: i32,
    pub title: String,
    pub owner_id: i32,
    /// Member user ids in ascending order.
    pub members: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn is_owner(&self, user_id: i32) -> bool {
        self.owner_id == user_id
    }

    pub fn is_member(&self, user_id: i32) -> bool {
        self.members.contains(&user_id)
    }

    /// Owners and members may read and edit a project and its tasks.
    pub fn can_access(&self, user_id: i32) -> bool {
        self.is_owner(user_id) || self.is_member(user_id)
    }
}

/// Payload for `POST /api/projects`.
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// User ids to add as members. Unknown ids are dropped.
    #[serde(default)]
    pub members: Vec<i32>,
}

/// Payload for `PUT`/`PATCH /api/projects/{id}`. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProjectUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    /// Replaces the member set when present.
    pub members: Option<Vec<i32>>,
}

/// Task counters shown in project listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct ProjectStats {
    pub ticket_count: i64,
    pub tasks_to_do_count: i64,
    pub tasks_high_prio_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: i32,
    pub title: String,
    pub member_count: usize,
    pub ticket_count: i64,
    pub tasks_to_do_count: i64,
    pub tasks_high_prio_count: i64,
    pub owner_id: i32,
}

impl ProjectSummary {
    pub fn new(project: &Project, stats: ProjectStats) -> Self {
        Self {
            id: project.id,
            title: project.title.clone(),
            member_count: project.members.len(),
            ticket_count: stats.ticket_count,
            tasks_to_do_count: stats.tasks_to_do_count,
            tasks_high_prio_count: stats.tasks_high_prio_count,
            owner_id: project.owner_id,
        }
    }
}

/// Full project view with members and tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub id: i32,
    pub title: String,
    pub owner_id: i32,
    pub members: Vec<UserSummary>,
    pub tasks: Vec<TaskView>,
}

/// Response to a project update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdated {
    pub id: i32,
    pub title: String,
    pub owner_data: UserSummary,
    pub members_data: Vec<UserSummary>,
}
