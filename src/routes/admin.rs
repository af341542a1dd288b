use crate::error::AppError;
use crate::helper::admin_helpers;
use crate::middleware::AdminUser;
use crate::models::PublicUser;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde_json::{json, Value};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/users", web::get().to(list_users))
            .route("/users/{id}/role", web::put().to(change_role))
            .route("/resources/{id}", web::delete().to(delete_resource))
            .default_service(web::route().to(super::not_found)),
    );
}

async fn list_users(pool: web::Data<DbPool>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
    let users = admin_helpers::fetch_all_users(&pool)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total": users.len(),
        "users": users,
    })))
}

async fn delete_resource(
    pool: web::Data<DbPool>,
    admin: AdminUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    admin_helpers::delete_any_resource(&pool, &admin, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Resource deleted successfully",
    })))
}

/// Body is read as raw JSON so a missing flag and a non-boolean flag get distinct messages.
async fn change_role(
    pool: web::Data<DbPool>,
    admin: AdminUser,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let is_admin = match body.get("is_admin") {
        None => return Err(AppError::validation("is_admin is required")),
        Some(value) => value
            .as_bool()
            .ok_or_else(|| AppError::validation("is_admin must be a boolean"))?,
    };

    let user = admin_helpers::change_user_role(&pool, &admin, path.into_inner(), is_admin)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User role updated successfully",
        "user": PublicUser::from(&user),
    })))
}
