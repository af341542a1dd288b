use crate::error::AppError;
use crate::helper::get_conn;
use crate::helper::validation_helpers::required;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{comments_db_operations, posts_db_operations};
use crate::models::Comment;
use crate::DbPool;
use actix_web::web;

pub fn fetch_comments(pool: &web::Data<DbPool>, post_id: Option<i64>) -> Result<Vec<Comment>, AppError> {
    let conn = get_conn(pool)?;
    Ok(comments_db_operations::list_comments(&conn, post_id)?)
}

pub fn create_comment(
    pool: &web::Data<DbPool>,
    user: &AuthenticatedUser,
    post_id: Option<i64>,
    content: Option<&str>,
) -> Result<Comment, AppError> {
    let content = required(content, "Content and post_id are required")?;
    let post_id = post_id.ok_or_else(|| AppError::validation("Content and post_id are required"))?;

    let conn = get_conn(pool)?;
    if !posts_db_operations::post_exists(&conn, post_id)? {
        return Err(AppError::not_found("Post not found"));
    }
    let comment = comments_db_operations::create_comment(&conn, user.id, post_id, &content)?;
    log::info!("User '{}' commented on post {}", user.username, post_id);
    Ok(comment)
}

pub fn delete_comment(pool: &web::Data<DbPool>, user: &AuthenticatedUser, comment_id: i64) -> Result<(), AppError> {
    let conn = get_conn(pool)?;
    let comment = comments_db_operations::read_comment(&conn, comment_id)?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    if !user.owns_or_admin(comment.author_id) {
        log::warn!("User '{}' tried to delete comment {} owned by user {}", user.username, comment_id, comment.author_id);
        return Err(AppError::forbidden("You do not have permission to delete this comment"));
    }
    comments_db_operations::delete_comment(&conn, comment_id)?;
    log::info!("User '{}' deleted comment {}", user.username, comment_id);
    Ok(())
}
