use crate::error::AppError;
use crate::helper::post_helpers;
use crate::helper::validation_helpers::PageQuery;
use crate::middleware::AuthenticatedUser;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct PostRequest {
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/posts")
            .route(web::get().to(list_posts))
            .route(web::post().to(create_post)),
    )
    .service(
        web::resource("/posts/{id}")
            .route(web::get().to(get_post))
            .route(web::put().to(update_post))
            .route(web::delete().to(delete_post)),
    )
    .route("/posts/{id}/like", web::post().to(toggle_like));
}

async fn list_posts(
    pool: web::Data<DbPool>,
    _user: AuthenticatedUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, per_page) = query.clamped();
    let result = post_helpers::fetch_posts(&pool, page, per_page)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "posts": result.items,
        "total": result.total,
        "pages": result.pages,
        "current_page": result.current_page,
    })))
}

async fn create_post(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = post_helpers::create_post(
        &pool,
        &user,
        body.title.as_deref(),
        body.content.as_deref(),
        body.category.as_deref(),
    )?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Post created successfully",
        "post": post,
    })))
}

async fn get_post(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let post = post_helpers::view_post(&pool, &user, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "post": post })))
}

async fn update_post(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<PostRequest>,
) -> Result<HttpResponse, AppError> {
    let post = post_helpers::update_post(
        &pool,
        &user,
        path.into_inner(),
        body.title.as_deref(),
        body.content.as_deref(),
        body.category.as_deref(),
    )?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Post updated successfully",
        "post": post,
    })))
}

async fn delete_post(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    post_helpers::delete_post(&pool, &user, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Post deleted successfully",
    })))
}

async fn toggle_like(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let toggle = post_helpers::toggle_like(&pool, &user, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "action": toggle.action,
        "liked": toggle.liked,
        "likes": toggle.likes,
    })))
}
