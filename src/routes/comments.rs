use crate::error::AppError;
use crate::helper::comment_helpers;
use crate::middleware::AuthenticatedUser;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct CommentFilter {
    post_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    content: Option<String>,
    post_id: Option<i64>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/comments")
            .route(web::get().to(list_comments))
            .route(web::post().to(create_comment)),
    )
    .route("/comments/{id}", web::delete().to(delete_comment));
}

async fn list_comments(
    pool: web::Data<DbPool>,
    _user: AuthenticatedUser,
    query: web::Query<CommentFilter>,
) -> Result<HttpResponse, AppError> {
    let comments = comment_helpers::fetch_comments(&pool, query.post_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total": comments.len(),
        "comments": comments,
    })))
}

async fn create_comment(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse, AppError> {
    let comment = comment_helpers::create_comment(&pool, &user, body.post_id, body.content.as_deref())?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Comment created successfully",
        "comment": comment,
    })))
}

async fn delete_comment(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    comment_helpers::delete_comment(&pool, &user, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Comment deleted successfully",
    })))
}
