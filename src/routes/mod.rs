use crate::error::AppError;
use actix_web::{error, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

pub mod admin;
pub mod auth;
pub mod comments;
pub mod posts;
pub mod resources;
pub mod users;

/// Mounts every JSON endpoint under `/api`, with extractor failures rendered
/// in the same error shape as handler failures.
pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .configure(auth::config)
            .configure(users::config)
            .configure(resources::config)
            .configure(posts::config)
            .configure(comments::config)
            .configure(admin::config)
            .default_service(web::route().to(not_found)),
    );
}

pub fn config_root(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health_check));
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "message": "Huxiang community API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::not_found("Resource not found"))
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(format!("Invalid request body: {}", err)).into()
}

fn query_error_handler(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(format!("Invalid query string: {}", err)).into()
}

fn path_error_handler(_err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::not_found("Resource not found").into()
}
