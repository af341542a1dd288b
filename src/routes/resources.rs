use crate::error::AppError;
use crate::helper::resource_helpers::{self, NewResource, ResourceUpdate};
use crate::helper::validation_helpers::{present, PageQuery};
use crate::middleware::AuthenticatedUser;
use crate::DbPool;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct ResourceFilter {
    category: Option<String>,
    tag: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateResourceRequest {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    image_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateResourceRequest {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    #[serde(default, deserialize_with = "present")]
    image_url: Option<Option<String>>,
    tags: Option<Vec<String>>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/resources")
            .route(web::get().to(list_resources))
            .route(web::post().to(create_resource)),
    )
    .service(
        web::resource("/resources/{id}")
            .route(web::get().to(get_resource))
            .route(web::put().to(update_resource))
            .route(web::delete().to(delete_resource)),
    );
}

async fn list_resources(
    pool: web::Data<DbPool>,
    query: web::Query<ResourceFilter>,
) -> Result<HttpResponse, AppError> {
    let (page, per_page) = PageQuery { page: query.page, per_page: query.per_page }.clamped();
    let result = resource_helpers::fetch_resources(
        &pool,
        query.category.as_deref(),
        query.tag.as_deref(),
        page,
        per_page,
    )?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "resources": result.items,
        "total": result.total,
        "pages": result.pages,
        "current_page": result.current_page,
    })))
}

async fn create_resource(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<CreateResourceRequest>,
) -> Result<HttpResponse, AppError> {
    let resource = resource_helpers::create_resource(
        &pool,
        &user,
        NewResource {
            title: body.title.as_deref(),
            description: body.description.as_deref(),
            category: body.category.as_deref(),
            image_url: body.image_url.as_deref(),
            tags: &body.tags,
        },
    )?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Resource created successfully",
        "resource": resource,
    })))
}

async fn get_resource(
    pool: web::Data<DbPool>,
    _user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let resource = resource_helpers::fetch_resource(&pool, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "resource": resource })))
}

async fn update_resource(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<UpdateResourceRequest>,
) -> Result<HttpResponse, AppError> {
    let resource = resource_helpers::update_resource(
        &pool,
        &user,
        path.into_inner(),
        ResourceUpdate {
            title: body.title.as_deref(),
            description: body.description.as_deref(),
            category: body.category.as_deref(),
            image_url: body.image_url.as_ref().map(|u| u.as_deref()),
            tags: body.tags.as_deref(),
        },
    )?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Resource updated successfully",
        "resource": resource,
    })))
}

async fn delete_resource(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    resource_helpers::delete_resource(&pool, &user, path.into_inner())?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Resource deleted successfully",
    })))
}
