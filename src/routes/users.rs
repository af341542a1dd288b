use crate::error::AppError;
use crate::helper::user_helpers;
use crate::helper::validation_helpers::present;
use crate::middleware::AuthenticatedUser;
use crate::models::PublicUser;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct ProfileUpdate {
    username: Option<String>,
    #[serde(default, deserialize_with = "present")]
    avatar: Option<Option<String>>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/profile/{id}")
            .route(web::get().to(get_profile))
            .route(web::put().to(update_profile)),
    );
}

async fn get_profile(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let profile = user_helpers::fetch_profile(&pool, &user, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": PublicUser::from(&profile),
    })))
}

async fn update_profile(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    let avatar = body.avatar.as_ref().map(|a| a.as_deref());
    let profile = user_helpers::update_profile(&pool, &user, path.into_inner(), body.username.as_deref(), avatar)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": PublicUser::from(&profile),
    })))
}
