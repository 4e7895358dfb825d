use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    CommentRepository, ProjectRepository, StoreError, StoreResult, TaskRepository,
    UserRepository, EMAIL_TAKEN, USERNAME_TAKEN,
};
use crate::models::{
    Comment, NewTask, NewUser, Project, ProjectStats, Task, TaskFilter, TaskPriority, TaskStatus,
    User,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    projects: BTreeMap<i32, Project>,
    tasks: BTreeMap<i32, Task>,
    comments: BTreeMap<i32, Comment>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    /// Keeps only ids of existing users, sorted and deduplicated.
    fn existing_users(&self, ids: &[i32]) -> Vec<i32> {
        let mut members: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| self.users.contains_key(id))
            .collect();
        members.sort_unstable();
        members.dedup();
        members
    }

    fn with_comment_count(&self, task: &Task) -> Task {
        let mut task = task.clone();
        task.comments_count = self
            .comments
            .values()
            .filter(|c| c.task_id == task.id)
            .count() as i64;
        task
    }

    fn stats(&self, project_id: i32) -> ProjectStats {
        let mut stats = ProjectStats::default();
        for task in self.tasks.values().filter(|t| t.project_id == project_id) {
            stats.ticket_count += 1;
            if task.status == TaskStatus::ToDo {
                stats.tasks_to_do_count += 1;
            }
            if task.priority == TaskPriority::High {
                stats.tasks_high_prio_count += 1;
            }
        }
        stats
    }

    fn remove_task(&mut self, id: i32) -> bool {
        self.comments.retain(|_, c| c.task_id != id);
        self.tasks.remove(&id).is_some()
    }
}

/// Store that keeps all rows in process memory.
///
/// Ids are handed out from a single counter shared by all tables. Used by the
/// test suite and by `KANMIND_IN_MEMORY=1` runs; nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(USERNAME_TAKEN.into()));
        }
        let id = tables.next_id();
        let user = User {
            id,
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_users(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        let tables = self.tables()?;
        Ok(tables
            .existing_users(ids)
            .into_iter()
            .filter_map(|id| tables.users.get(&id).cloned())
            .collect())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create_project(
        &self,
        owner_id: i32,
        title: &str,
        members: &[i32],
    ) -> StoreResult<Project> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        let project = Project {
            id,
            title: title.to_string(),
            owner_id,
            members: tables.existing_users(members),
            created_at: Utc::now(),
        };
        tables.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: i32) -> StoreResult<Option<Project>> {
        Ok(self.tables()?.projects.get(&id).cloned())
    }

    async fn list_projects_for(&self, user_id: i32) -> StoreResult<Vec<Project>> {
        Ok(self
            .tables()?
            .projects
            .values()
            .rev()
            .filter(|p| p.can_access(user_id))
            .cloned()
            .collect())
    }

    async fn update_project(
        &self,
        id: i32,
        title: Option<&str>,
        members: Option<&[i32]>,
    ) -> StoreResult<Project> {
        let mut tables = self.tables()?;
        let members = members.map(|ids| tables.existing_users(ids));
        let project = tables
            .projects
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Project"))?;
        if let Some(title) = title {
            project.title = title.to_string();
        }
        if let Some(members) = members {
            project.members = members;
        }
        Ok(project.clone())
    }

    async fn delete_project(&self, id: i32) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }
        let task_ids: Vec<i32> = tables
            .tasks
            .values()
            .filter(|t| t.project_id == id)
            .map(|t| t.id)
            .collect();
        for task_id in task_ids {
            tables.remove_task(task_id);
        }
        Ok(true)
    }

    async fn project_stats(&self, id: i32) -> StoreResult<ProjectStats> {
        Ok(self.tables()?.stats(id))
    }

    async fn stats_for_projects(&self, ids: &[i32]) -> StoreResult<HashMap<i32, ProjectStats>> {
        let tables = self.tables()?;
        Ok(ids.iter().map(|&id| (id, tables.stats(id))).collect())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables()?;
        if !tables.projects.contains_key(&task.project_id) {
            return Err(StoreError::NotFound("Project"));
        }
        let id = tables.next_id();
        let now = Utc::now();
        let task = Task {
            id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            category: task.category,
            assignee_id: task.assignee_id,
            reviewer_id: task.reviewer_id,
            due_date: task.due_date,
            comments_count: 0,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: i32) -> StoreResult<Option<Task>> {
        let tables = self.tables()?;
        Ok(tables.tasks.get(&id).map(|t| tables.with_comment_count(t)))
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let tables = self.tables()?;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        Ok(tables
            .tasks
            .values()
            .rev()
            .filter(|t| match filter.visible_to {
                Some(user_id) => tables
                    .projects
                    .get(&t.project_id)
                    .map_or(false, |p| p.can_access(user_id)),
                None => true,
            })
            .filter(|t| filter.project_id.map_or(true, |id| t.project_id == id))
            .filter(|t| filter.assignee_id.map_or(true, |id| t.assignee_id == Some(id)))
            .filter(|t| filter.reviewer_id.map_or(true, |id| t.reviewer_id == Some(id)))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| filter.priority.map_or(true, |p| t.priority == p))
            .filter(|t| match &search {
                Some(needle) => {
                    contains_ignore_case(&t.title, needle)
                        || contains_ignore_case(&t.description, needle)
                }
                None => true,
            })
            .map(|t| tables.with_comment_count(t))
            .collect())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        let mut tables = self.tables()?;
        let stored = tables
            .tasks
            .get_mut(&task.id)
            .ok_or(StoreError::NotFound("Task"))?;
        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.status = task.status;
        stored.priority = task.priority;
        stored.category = task.category.clone();
        stored.assignee_id = task.assignee_id;
        stored.reviewer_id = task.reviewer_id;
        stored.due_date = task.due_date;
        stored.updated_at = Utc::now();
        let stored = stored.clone();
        Ok(tables.with_comment_count(&stored))
    }

    async fn delete_task(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables()?.remove_task(id))
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create_comment(
        &self,
        task_id: i32,
        author_id: i32,
        content: &str,
    ) -> StoreResult<Comment> {
        let mut tables = self.tables()?;
        if !tables.tasks.contains_key(&task_id) {
            return Err(StoreError::NotFound("Task"));
        }
        let id = tables.next_id();
        let comment = Comment {
            id,
            task_id,
            author_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: i32) -> StoreResult<Option<Comment>> {
        Ok(self.tables()?.comments.get(&id).cloned())
    }

    async fn list_comments(&self, task_id: i32) -> StoreResult<Vec<Comment>> {
        Ok(self
            .tables()?
            .comments
            .values()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete_comment(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables()?.comments.remove(&id).is_some())
    }
}
