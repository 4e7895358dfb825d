use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use super::{
    CommentRepository, ProjectRepository, StoreError, StoreResult, TaskRepository,
    UserRepository, EMAIL_TAKEN, USERNAME_TAKEN,
};
use crate::models::{
    Comment, NewTask, NewUser, Project, ProjectStats, Task, TaskFilter, User,
};

const USER_COLUMNS: &str = "id, username, email, fullname, password_hash, created_at";

const PROJECT_COLUMNS: &str = "p.id, p.title, p.owner_id, p.created_at, \
     ARRAY(SELECT m.user_id FROM project_members m WHERE m.project_id = p.id ORDER BY m.user_id) AS members";

const TASK_COLUMNS: &str = "t.id, t.project_id, t.title, t.description, t.status, t.priority, \
     t.category, t.assignee_id, t.reviewer_id, t.due_date, \
     (SELECT COUNT(*) FROM comments c WHERE c.task_id = t.id) AS comments_count, \
     t.created_at, t.updated_at";

const COMMENT_COLUMNS: &str = "id, task_id, author_id, content, created_at";

/// PostgreSQL-backed store. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the migrations under `migrations/`.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unique_violation(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            let message = match db.constraint() {
                Some(c) if c.contains("username") => USERNAME_TAKEN,
                _ => EMAIL_TAKEN,
            };
            return StoreError::Conflict(message.into());
        }
    }
    StoreError::Database(error)
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, fullname, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.fullname)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation)
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_users(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM users WHERE id = ANY($1) ORDER BY id",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn create_project(
        &self,
        owner_id: i32,
        title: &str,
        members: &[i32],
    ) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i32,) =
            sqlx::query_as("INSERT INTO projects (title, owner_id) VALUES ($1, $2) RETURNING id")
                .bind(title)
                .bind(owner_id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            "INSERT INTO project_members (project_id, user_id) \
             SELECT $1, u.id FROM users u WHERE u.id = ANY($2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(members)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_project(id)
            .await?
            .ok_or(StoreError::NotFound("Project"))
    }

    async fn find_project(&self, id: i32) -> StoreResult<Option<Project>> {
        let sql = format!("SELECT {} FROM projects p WHERE p.id = $1", PROJECT_COLUMNS);
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_projects_for(&self, user_id: i32) -> StoreResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects p \
             WHERE p.owner_id = $1 \
                OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = $1) \
             ORDER BY p.id DESC",
            PROJECT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Project>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_project(
        &self,
        id: i32,
        title: Option<&str>,
        members: Option<&[i32]>,
    ) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound("Project"));
        }

        if let Some(title) = title {
            sqlx::query("UPDATE projects SET title = $1 WHERE id = $2")
                .bind(title)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(members) = members {
            sqlx::query("DELETE FROM project_members WHERE project_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO project_members (project_id, user_id) \
                 SELECT $1, u.id FROM users u WHERE u.id = ANY($2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(members)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_project(id)
            .await?
            .ok_or(StoreError::NotFound("Project"))
    }

    async fn delete_project(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn project_stats(&self, id: i32) -> StoreResult<ProjectStats> {
        Ok(sqlx::query_as::<_, ProjectStats>(
            "SELECT COUNT(*) AS ticket_count, \
                    COUNT(*) FILTER (WHERE status = 'to-do') AS tasks_to_do_count, \
                    COUNT(*) FILTER (WHERE priority = 'high') AS tasks_high_prio_count \
             FROM tasks WHERE project_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn stats_for_projects(&self, ids: &[i32]) -> StoreResult<HashMap<i32, ProjectStats>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(i32, i64, i64, i64)> = sqlx::query_as(
            "SELECT project_id, \
                    COUNT(*), \
                    COUNT(*) FILTER (WHERE status = 'to-do'), \
                    COUNT(*) FILTER (WHERE priority = 'high') \
             FROM tasks WHERE project_id = ANY($1) \
             GROUP BY project_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut stats: HashMap<i32, ProjectStats> =
            ids.iter().map(|&id| (id, ProjectStats::default())).collect();
        for (project_id, ticket_count, tasks_to_do_count, tasks_high_prio_count) in rows {
            stats.insert(
                project_id,
                ProjectStats {
                    ticket_count,
                    tasks_to_do_count,
                    tasks_high_prio_count,
                },
            );
        }
        Ok(stats)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO tasks \
                 (project_id, title, description, status, priority, category, assignee_id, reviewer_id, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(task.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(&task.category)
        .bind(task.assignee_id)
        .bind(task.reviewer_id)
        .bind(task.due_date)
        .fetch_one(&self.pool)
        .await?;

        self.find_task(id).await?.ok_or(StoreError::NotFound("Task"))
    }

    async fn find_task(&self, id: i32) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks t WHERE t.id = $1", TASK_COLUMNS);
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM tasks t WHERE TRUE", TASK_COLUMNS));

        if let Some(user_id) = filter.visible_to {
            query
                .push(" AND t.project_id IN (SELECT p.id FROM projects p WHERE p.owner_id = ")
                .push_bind(user_id)
                .push(" UNION SELECT m.project_id FROM project_members m WHERE m.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if let Some(project_id) = filter.project_id {
            query.push(" AND t.project_id = ").push_bind(project_id);
        }
        if let Some(assignee_id) = filter.assignee_id {
            query.push(" AND t.assignee_id = ").push_bind(assignee_id);
        }
        if let Some(reviewer_id) = filter.reviewer_id {
            query.push(" AND t.reviewer_id = ").push_bind(reviewer_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            query.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", escape_like(search));
            query
                .push(" AND (t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query.push(" ORDER BY t.id DESC");

        Ok(query
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        let result = sqlx::query(
            "UPDATE tasks \
             SET title = $1, description = $2, status = $3, priority = $4, category = $5, \
                 assignee_id = $6, reviewer_id = $7, due_date = $8, updated_at = NOW() \
             WHERE id = $9",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(&task.category)
        .bind(task.assignee_id)
        .bind(task.reviewer_id)
        .bind(task.due_date)
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Task"));
        }

        self.find_task(task.id)
            .await?
            .ok_or(StoreError::NotFound("Task"))
    }

    async fn delete_task(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn create_comment(
        &self,
        task_id: i32,
        author_id: i32,
        content: &str,
    ) -> StoreResult<Comment> {
        let sql = format!(
            "INSERT INTO comments (task_id, author_id, content) VALUES ($1, $2, $3) RETURNING {}",
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(task_id)
            .bind(author_id)
            .bind(content)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_comment(&self, id: i32) -> StoreResult<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = $1", COMMENT_COLUMNS);
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_comments(&self, task_id: i32) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE task_id = $1 ORDER BY created_at, id",
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
