use crate::error::AppError;
use crate::helper::auth_helpers::{self, Registration};
use crate::middleware::AuthenticatedUser;
use crate::models::PublicUser;
use crate::{AppState, DbPool};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email
    username: Option<String>,
    password: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/logout", web::post().to(logout));
}

async fn register(
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let user = auth_helpers::register_user(
        &pool,
        &state,
        Registration {
            username: body.username.as_deref(),
            email: body.email.as_deref(),
            password: body.password.as_deref(),
        },
    )?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered successfully",
        "user": PublicUser::from(&user),
    })))
}

async fn login(
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let (user, token) = auth_helpers::login_user(&pool, &state, body.username.as_deref(), body.password.as_deref())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Login successful",
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": state.jwt.ttl_seconds(),
        "user": PublicUser::from(&user),
    })))
}

async fn logout(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    auth_helpers::logout_user(&state, &user)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Successfully logged out",
    })))
}
