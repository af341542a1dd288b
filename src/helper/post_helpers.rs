use crate::error::AppError;
use crate::helper::get_conn;
use crate::helper::validation_helpers::{check_post_content, check_post_title, optional_non_blank, required};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{likes_db_operations, posts_db_operations};
use crate::models::{LikeToggle, Page, Post, PostChanges, DEFAULT_POST_CATEGORY};
use crate::DbPool;
use actix_web::web;
use rusqlite::Connection;

pub fn fetch_posts(pool: &web::Data<DbPool>, page: i64, per_page: i64) -> Result<Page<Post>, AppError> {
    let conn = get_conn(pool)?;
    Ok(posts_db_operations::list_posts(&conn, page, per_page)?)
}

pub fn create_post(
    pool: &web::Data<DbPool>,
    user: &AuthenticatedUser,
    title: Option<&str>,
    content: Option<&str>,
    category: Option<&str>,
) -> Result<Post, AppError> {
    let title = required(title, "Title and content are required")?;
    let content = required(content, "Title and content are required")?;
    check_post_title(&title)?;
    check_post_content(&content)?;
    let category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_POST_CATEGORY);

    let conn = get_conn(pool)?;
    let post = posts_db_operations::create_post(&conn, user.id, &title, &content, category)?;
    log::info!("User '{}' created post {}", user.username, post.id);
    Ok(post)
}

/// Reads a post, counting the view unless the viewer is its owner or an admin.
pub fn view_post(pool: &web::Data<DbPool>, viewer: &AuthenticatedUser, post_id: i64) -> Result<Post, AppError> {
    let conn = get_conn(pool)?;
    let owner_id = posts_db_operations::read_post_owner(&conn, post_id)?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    if !viewer.owns_or_admin(owner_id) {
        posts_db_operations::increment_views(&conn, post_id)?;
    }

    posts_db_operations::read_post(&conn, post_id)?
        .ok_or_else(|| AppError::not_found("Post not found"))
}

fn ensure_owner_or_admin(conn: &Connection, user: &AuthenticatedUser, post_id: i64) -> Result<(), AppError> {
    let owner_id = posts_db_operations::read_post_owner(conn, post_id)?
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    if user.owns_or_admin(owner_id) {
        Ok(())
    } else {
        log::warn!("User '{}' tried to modify post {} owned by user {}", user.username, post_id, owner_id);
        Err(AppError::forbidden("You do not have permission to modify this post"))
    }
}

pub fn update_post(
    pool: &web::Data<DbPool>,
    user: &AuthenticatedUser,
    post_id: i64,
    title: Option<&str>,
    content: Option<&str>,
    category: Option<&str>,
) -> Result<Post, AppError> {
    let conn = get_conn(pool)?;
    ensure_owner_or_admin(&conn, user, post_id)?;

    let changes = PostChanges {
        title: optional_non_blank(title, "Title cannot be empty")?,
        content: optional_non_blank(content, "Content cannot be empty")?,
        category: optional_non_blank(category, "Category cannot be empty")?,
    };
    if let Some(title) = &changes.title {
        check_post_title(title)?;
    }
    if let Some(content) = &changes.content {
        check_post_content(content)?;
    }

    let post = posts_db_operations::update_post(&conn, post_id, &changes)?
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    log::info!("User '{}' updated post {}", user.username, post_id);
    Ok(post)
}

pub fn delete_post(pool: &web::Data<DbPool>, user: &AuthenticatedUser, post_id: i64) -> Result<(), AppError> {
    let mut conn = get_conn(pool)?;
    ensure_owner_or_admin(&conn, user, post_id)?;
    posts_db_operations::delete_post(&mut conn, post_id)?;
    log::info!("User '{}' deleted post {}", user.username, post_id);
    Ok(())
}

pub fn toggle_like(pool: &web::Data<DbPool>, user: &AuthenticatedUser, post_id: i64) -> Result<LikeToggle, AppError> {
    let mut conn = get_conn(pool)?;
    likes_db_operations::toggle_like(&mut conn, user.id, post_id)?
        .ok_or_else(|| AppError::not_found("Post not found"))
}
