use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CommentInput, CommentView},
    store::Store,
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};

use super::{accessible_task, user_summaries};

/// Comments on a task, oldest first.
#[get("/{task_id}/comments")]
pub async fn list_comments(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let store = store.get_ref();
    let (task, _) = accessible_task(store, task_id.into_inner(), user.id()).await?;

    let comments = store.list_comments(task.id).await?;
    let mut authors: Vec<i32> = comments.iter().map(|c| c.author_id).collect();
    authors.sort_unstable();
    authors.dedup();
    let users = user_summaries(store, &authors).await?;

    let views: Vec<CommentView> = comments
        .into_iter()
        .map(|c| {
            let author = users
                .get(&c.author_id)
                .map(|u| u.fullname.clone())
                .unwrap_or_default();
            CommentView::new(c, author)
        })
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

#[post("/{task_id}/comments")]
pub async fn create_comment(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
    comment_data: web::Json<CommentInput>,
) -> Result<impl Responder, AppError> {
    let store = store.get_ref();
    let (task, _) = accessible_task(store, task_id.into_inner(), user.id()).await?;

    let content = comment_data
        .content()
        .ok_or_else(|| AppError::BadRequest("Content cannot be empty.".into()))?;

    let author = store
        .find_user(user.id())
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

    let comment = store.create_comment(task.id, author.id, content).await?;
    log::info!("user {} commented on task {}", author.id, task.id);

    Ok(HttpResponse::Created().json(CommentView::new(comment, author.fullname)))
}

/// Deletes a comment. Only its author may do so, and only while they can
/// still access the task's project.
#[delete("/{task_id}/comments/{comment_id}")]
pub async fn delete_comment(
    store: web::Data<dyn Store>,
    user: AuthenticatedUser,
    path: web::Path<(i32, i32)>,
) -> Result<impl Responder, AppError> {
    let (task_id, comment_id) = path.into_inner();
    let store = store.get_ref();
    let (task, _) = accessible_task(store, task_id, user.id()).await?;

    let comment = store
        .find_comment(comment_id)
        .await?
        .filter(|c| c.task_id == task.id)
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

    if comment.author_id != user.id() {
        log::warn!("user {} tried to delete comment {}", user.id(), comment.id);
        return Err(AppError::Forbidden(
            "Only the author can delete this comment.".into(),
        ));
    }

    if !store.delete_comment(comment.id).await? {
        return Err(AppError::NotFound("Comment not found".into()));
    }
    log::info!("user {} deleted comment {}", user.id(), comment.id);

    Ok(HttpResponse::NoContent().finish())
}
