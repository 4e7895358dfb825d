use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{
        ProjectDetail, ProjectInput, ProjectSummary, ProjectUpdate, ProjectUpdated, TaskFilter,
        UserSummary,
    },
    store::Store,
};
use actix_web::{delete, get, post, route, web, HttpResponse, Responder};
use validator::Validate;

use super::{accessible_project, task_views, user_summaries};

/// Lists the projects the caller owns or is a member of.
///
/// ## Responses:
/// - `200 OK`: JSON array of project summaries with member and task counters.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[get("")]
pub async fn list_projects(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let projects = store.list_projects_for(user.id()).await?;
    let ids: Vec<i32> = projects.iter().map(|p| p.id).collect();
    let stats = store.stats_for_projects(&ids).await?;

    let summaries: Vec<ProjectSummary> = projects
        .iter()
        .map(|p| ProjectSummary::new(p, stats.get(&p.id).copied().unwrap_or_default()))
        .collect();

    Ok(HttpResponse::Ok().json(summaries))
}

/// Creates a project owned by the caller.
///
/// ## Request Body:
/// - `title`: 1 to 200 characters.
/// - `members` (optional): user ids to add. Ids matching no user are ignored.
///
/// ## Responses:
/// - `201 Created`: The new project's summary.
/// - `422 Unprocessable Entity`: If the title is empty or too long.
#[post("")]
pub async fn create_project(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    project_data: web::Json<ProjectInput>,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;
    let ProjectInput { title, mut members } = project_data.into_inner();
    members.sort_unstable();
    members.dedup();

    let project = store.create_project(user.id(), &title, &members).await?;
    log::info!("user {} created project {}", user.id(), project.id);

    let stats = store.project_stats(project.id).await?;
    Ok(HttpResponse::Created().json(ProjectSummary::new(&project, stats)))
}

/// Retrieves a project with its members and tasks.
///
/// ## Responses:
/// - `200 OK`: `{id, title, owner_id, members, tasks}`.
/// - `403 Forbidden`: If the caller is neither owner nor member.
/// - `404 Not Found`: If the project does not exist.
#[get("/{id}")]
pub async fn get_project(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    project_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let store = store.get_ref();
    let project = accessible_project(store, project_id.into_inner(), user.id()).await?;

    let users = user_summaries(store, &project.members).await?;
    let members = project
        .members
        .iter()
        .filter_map(|id| users.get(id).cloned())
        .collect();

    let tasks = store
        .list_tasks(&TaskFilter {
            project_id: Some(project.id),
            ..TaskFilter::default()
        })
        .await?;

    Ok(HttpResponse::Ok().json(ProjectDetail {
        id: project.id,
        title: project.title,
        owner_id: project.owner_id,
        members,
        tasks: task_views(store, tasks).await?,
    }))
}

/// Updates a project's title and/or replaces its members.
///
/// Owners and members may update. `PUT` and `PATCH` behave the same: absent
/// fields are left unchanged.
///
/// ## Responses:
/// - `200 OK`: `{id, title, owner_data, members_data}`.
/// - `400 Bad Request`: If any member id matches no user.
/// - `403 Forbidden`: If the caller is neither owner nor member.
/// - `404 Not Found`: If the project does not exist.
/// - `422 Unprocessable Entity`: If the title is empty or too long.
#[route("/{id}", method = "PUT", method = "PATCH")]
pub async fn update_project(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    project_id: web::Path<i32>,
    project_data: web::Json<ProjectUpdate>,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;
    let store = store.get_ref();
    let project = accessible_project(store, project_id.into_inner(), user.id()).await?;
    let ProjectUpdate { title, members } = project_data.into_inner();

    let members = match members {
        Some(mut ids) => {
            ids.sort_unstable();
            ids.dedup();
            let found = store.find_users(&ids).await?;
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.iter().any(|u| u.id == **id))
                .map(i32::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Users with IDs {} do not exist.",
                    missing.join(", ")
                )));
            }
            Some(ids)
        }
        None => None,
    };

    let project = store
        .update_project(project.id, title.as_deref(), members.as_deref())
        .await?;
    log::info!("user {} updated project {}", user.id(), project.id);

    let mut ids = project.members.clone();
    ids.push(project.owner_id);
    let users = user_summaries(store, &ids).await?;
    let owner_data = users
        .get(&project.owner_id)
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("Project owner missing".into()))?;
    let members_data: Vec<UserSummary> = project
        .members
        .iter()
        .filter_map(|id| users.get(id).cloned())
        .collect();

    Ok(HttpResponse::Ok().json(ProjectUpdated {
        id: project.id,
        title: project.title,
        owner_data,
        members_data,
    }))
}

/// Deletes a project together with its tasks and comments.
///
/// ## Responses:
/// - `204 No Content`: On success.
/// - `403 Forbidden`: If the caller is not the owner.
/// - `404 Not Found`: If the project does not exist.
#[delete("/{id}")]
pub async fn delete_project(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    project_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let project = store
        .find_project(project_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    if !project.is_owner(user.id()) {
        log::warn!("user {} tried to delete project {}", user.id(), project.id);
        return Err(AppError::Forbidden(
            "Only the project owner can delete this project.".into(),
        ));
    }

    if !store.delete_project(project.id).await? {
        return Err(AppError::NotFound("Project not found".into()));
    }
    log::info!("user {} deleted project {}", user.id(), project.id);

    Ok(HttpResponse::NoContent().finish())
}
