pub mod auth;
pub mod comments;
pub mod health;
pub mod index;
pub mod projects;
pub mod tasks;

use std::collections::HashMap;

use actix_web::web;

use crate::auth::AuthMiddleware;
use crate::error::AppError;
use crate::models::{Project, Task, TaskView, UserSummary};
use crate::store::Store;

/// Registers `/health` and the authenticated `/api` scope.
///
/// The app must provide `web::Data<dyn Store>`, `web::Data<TokenService>` and
/// `web::Data<PasswordHasher>`, and should trim trailing slashes with
/// `middleware::NormalizePath::trim()`.
pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health).service(
        web::scope("/api")
            .wrap(AuthMiddleware)
            .configure(config),
    );
}

/// Routes inside the `/api` scope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(index::index)
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login)),
        )
        .route("/registration", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .service(auth::email_check)
        .service(
            web::scope("/projects")
                .service(projects::list_projects)
                .service(projects::create_project)
                .service(projects::get_project)
                .service(projects::update_project)
                .service(projects::delete_project),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::assigned_to_me)
                .service(tasks::reviewing)
                .service(tasks::list_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::replace_task)
                .service(tasks::patch_task)
                .service(tasks::delete_task)
                .service(comments::list_comments)
                .service(comments::create_comment)
                .service(comments::delete_comment),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::NotFound(err.to_string()).into())
}

/// Loads a project the user owns or belongs to.
///
/// 404 if it does not exist, 403 if the user has no access.
pub(crate) async fn accessible_project(
    store: &dyn Store,
    project_id: i32,
    user_id: i32,
) -> Result<Project, AppError> {
    let project = store
        .find_project(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if !project.can_access(user_id) {
        log::warn!("user {} denied access to project {}", user_id, project_id);
        return Err(AppError::Forbidden(
            "You must be the project owner or a member to perform this action.".into(),
        ));
    }
    Ok(project)
}

/// Loads a task together with its project, applying the project access rule.
pub(crate) async fn accessible_task(
    store: &dyn Store,
    task_id: i32,
    user_id: i32,
) -> Result<(Task, Project), AppError> {
    let task = store
        .find_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    let project = accessible_project(store, task.project_id, user_id).await?;
    Ok((task, project))
}

pub(crate) async fn user_summaries(
    store: &dyn Store,
    ids: &[i32],
) -> Result<HashMap<i32, UserSummary>, AppError> {
    Ok(store
        .find_users(ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect())
}

/// Expands assignees and reviewers with a single user lookup.
pub(crate) async fn task_views(
    store: &dyn Store,
    tasks: Vec<Task>,
) -> Result<Vec<TaskView>, AppError> {
    let mut ids: Vec<i32> = tasks
        .iter()
        .flat_map(|t| [t.assignee_id, t.reviewer_id])
        .flatten()
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let users = user_summaries(store, &ids).await?;
    Ok(tasks
        .into_iter()
        .map(|t| TaskView::new(t, &users))
        .collect())
}
