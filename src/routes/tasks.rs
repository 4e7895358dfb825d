use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{NewTask, Project, Task, TaskFilter, TaskInput, TaskQuery, TaskUpdate, TaskView},
    store::Store,
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use validator::Validate;

use super::{accessible_project, accessible_task, task_views};

/// Retrieves the tasks visible to the caller.
///
/// Only tasks in projects the caller owns or belongs to are returned, newest
/// first.
///
/// ## Query Parameters:
/// - `status` (optional): "to-do", "in-progress", "review" or "done".
/// - `priority` (optional): "low", "medium" or "high".
/// - `project` (optional): Restricts the result to one project.
/// - `search` (optional): Case-insensitive match on title or description.
///
/// ## Responses:
/// - `200 OK`: JSON array of tasks.
/// - `400 Bad Request`: If a query parameter cannot be parsed.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[get("")]
pub async fn list_tasks(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    query: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    let filter = TaskFilter {
        visible_to: Some(user.id()),
        project_id: query.project,
        status: query.status,
        priority: query.priority,
        search: query.search.filter(|s| !s.trim().is_empty()),
        ..TaskFilter::default()
    };
    filtered(store.get_ref(), filter).await
}

/// Tasks assigned to the caller.
#[get("/assigned-to-me")]
pub async fn assigned_to_me(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter {
        visible_to: Some(user.id()),
        assignee_id: Some(user.id()),
        ..TaskFilter::default()
    };
    filtered(store.get_ref(), filter).await
}

/// Tasks the caller is reviewing.
#[get("/reviewing")]
pub async fn reviewing(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter {
        visible_to: Some(user.id()),
        reviewer_id: Some(user.id()),
        ..TaskFilter::default()
    };
    filtered(store.get_ref(), filter).await
}

async fn filtered(store: &dyn Store, filter: TaskFilter) -> Result<HttpResponse, AppError> {
    let tasks = store.list_tasks(&filter).await?;
    Ok(HttpResponse::Ok().json(task_views(store, tasks).await?))
}

/// Creates a task in a project the caller owns or belongs to.
///
/// ## Request Body:
/// - `project`: The id of the project (required).
/// - `title`: 1 to 200 characters (required).
/// - `description`, `status`, `priority`, `category`, `due_date` (optional).
/// - `assignee_id`, `reviewer_id` (optional): Must be the owner or a member.
///
/// ## Responses:
/// - `201 Created`: The new task.
/// - `400 Bad Request`: If the assignee or reviewer is not part of the project.
/// - `403 Forbidden`: If the caller is neither owner nor member.
/// - `404 Not Found`: If the project does not exist.
/// - `422 Unprocessable Entity`: If a field is too long or the title is empty.
#[post("")]
pub async fn create_task(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let store = store.get_ref();
    let project = accessible_project(store, task_data.project, user.id()).await?;

    check_role(&project, task_data.assignee_id, "Assignee")?;
    check_role(&project, task_data.reviewer_id, "Reviewer")?;

    let task = store.create_task(NewTask::from(task_data.into_inner())).await?;
    log::info!("user {} created task {} in project {}", user.id(), task.id, project.id);

    Ok(HttpResponse::Created().json(task_view(store, task).await?))
}

/// Retrieves a single task.
///
/// ## Responses:
/// - `200 OK`: The task.
/// - `403 Forbidden`: If the caller cannot access the task's project.
/// - `404 Not Found`: If the task does not exist.
#[get("/{id}")]
pub async fn get_task(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let store = store.get_ref();
    let (task, _) = accessible_task(store, task_id.into_inner(), user.id()).await?;
    Ok(HttpResponse::Ok().json(task_view(store, task).await?))
}

/// Replaces a task. `title` and `project` are required; the project must be
/// the one the task already belongs to.
#[put("/{id}")]
pub async fn replace_task(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    let update = task_data.into_inner();
    if update.title.is_none() || update.project.is_none() {
        return Err(AppError::BadRequest(
            "`title` and `project` are required; use PATCH for partial updates.".into(),
        ));
    }
    let view = apply_update(store.get_ref(), user, task_id.into_inner(), update).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Updates the fields present in the body. The response has no
/// `comments_count`.
#[patch("/{id}")]
pub async fn patch_task(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    let view =
        apply_update(store.get_ref(), user, task_id.into_inner(), task_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view.without_comments_count()))
}

async fn apply_update(
    store: &dyn Store,
    user: AuthenticatedUser,
    task_id: i32,
    update: TaskUpdate,
) -> Result<TaskView, AppError> {
    update.validate()?;
    let (mut task, project) = accessible_task(store, task_id, user.id()).await?;

    if update.project.is_some_and(|p| p != task.project_id) {
        return Err(AppError::BadRequest(
            "Changing the project of a task is not allowed.".into(),
        ));
    }
    if let Some(assignee_id) = update.assignee_id {
        check_role(&project, assignee_id, "Assignee")?;
    }
    if let Some(reviewer_id) = update.reviewer_id {
        check_role(&project, reviewer_id, "Reviewer")?;
    }

    task.apply(update);
    let task = store.update_task(&task).await?;
    log::info!("user {} updated task {}", user.id(), task.id);

    task_view(store, task).await
}

/// Deletes a task and its comments.
///
/// Only the project owner and the task's assignee may delete it.
///
/// ## Responses:
/// - `204 No Content`: On success.
/// - `403 Forbidden`: If the caller is neither the project owner nor the assignee.
/// - `404 Not Found`: If the task does not exist.
#[delete("/{id}")]
pub async fn delete_task(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let task = store
        .find_task(task_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    let project = store
        .find_project(task.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if !project.is_owner(user.id()) && task.assignee_id != Some(user.id()) {
        log::warn!("user {} tried to delete task {}", user.id(), task.id);
        return Err(AppError::Forbidden(
            "Only the project owner or the task assignee can delete this task.".into(),
        ));
    }

    if !store.delete_task(task.id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }
    log::info!("user {} deleted task {}", user.id(), task.id);

    Ok(HttpResponse::NoContent().finish())
}

/// Assignees and reviewers must be the project owner or one of its members.
fn check_role(project: &Project, user_id: Option<i32>, role: &str) -> Result<(), AppError> {
    match user_id {
        Some(id) if !project.can_access(id) => Err(AppError::BadRequest(format!(
            "{} must be a member of the project.",
            role
        ))),
        _ => Ok(()),
    }
}

async fn task_view(store: &dyn Store, task: Task) -> Result<TaskView, AppError> {
    task_views(store, vec![task])
        .await?
        .pop()
        .ok_or_else(|| AppError::InternalServerError("Task view missing".into()))
}
