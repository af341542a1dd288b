use crate::error::AppError;
use crate::helper::get_conn;
use crate::helper::validation_helpers::{clean_tags, optional_non_blank, required};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::resources_db_operations;
use crate::models::{CulturalResource, Page, ResourceChanges, DEFAULT_RESOURCE_CATEGORY};
use crate::DbPool;
use actix_web::web;

pub struct NewResource<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub tags: &'a [String],
}

/// Blank filters are treated as absent.
pub fn fetch_resources(
    pool: &web::Data<DbPool>,
    category: Option<&str>,
    tag: Option<&str>,
    page: i64,
    per_page: i64,
) -> Result<Page<CulturalResource>, AppError> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let tag = tag.map(str::trim).filter(|t| !t.is_empty());
    let conn = get_conn(pool)?;
    Ok(resources_db_operations::list_resources(&conn, category, tag, page, per_page)?)
}

pub fn create_resource(
    pool: &web::Data<DbPool>,
    user: &AuthenticatedUser,
    new: NewResource<'_>,
) -> Result<CulturalResource, AppError> {
    let title = required(new.title, "Title and description are required")?;
    let description = required(new.description, "Title and description are required")?;
    let category = new
        .category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_RESOURCE_CATEGORY);
    let image_url = new.image_url.map(str::trim).filter(|u| !u.is_empty());
    let tags = clean_tags(new.tags)?;

    let conn = get_conn(pool)?;
    let resource = resources_db_operations::create_resource(
        &conn,
        user.id,
        &title,
        &description,
        category,
        image_url,
        &tags,
    )?;
    log::info!("User '{}' created resource {}", user.username, resource.id);
    Ok(resource)
}

pub fn fetch_resource(pool: &web::Data<DbPool>, resource_id: i64) -> Result<CulturalResource, AppError> {
    let conn = get_conn(pool)?;
    resources_db_operations::read_resource(&conn, resource_id)?
        .ok_or_else(|| AppError::not_found("Resource not found"))
}

fn ensure_owner_or_admin(conn: &rusqlite::Connection, user: &AuthenticatedUser, resource_id: i64) -> Result<(), AppError> {
    let owner_id = resources_db_operations::read_resource_owner(conn, resource_id)?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;
    if user.owns_or_admin(owner_id) {
        Ok(())
    } else {
        log::warn!("User '{}' tried to modify resource {} owned by user {}", user.username, resource_id, owner_id);
        Err(AppError::forbidden("You do not have permission to modify this resource"))
    }
}

pub struct ResourceUpdate<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub image_url: Option<Option<&'a str>>,
    pub tags: Option<&'a [String]>,
}

pub fn update_resource(
    pool: &web::Data<DbPool>,
    user: &AuthenticatedUser,
    resource_id: i64,
    update: ResourceUpdate<'_>,
) -> Result<CulturalResource, AppError> {
    let conn = get_conn(pool)?;
    ensure_owner_or_admin(&conn, user, resource_id)?;

    let changes = ResourceChanges {
        title: optional_non_blank(update.title, "Title cannot be empty")?,
        description: optional_non_blank(update.description, "Description cannot be empty")?,
        category: optional_non_blank(update.category, "Category cannot be empty")?,
        image_url: update
            .image_url
            .map(|url| url.map(str::trim).filter(|u| !u.is_empty()).map(str::to_string)),
        tags: update.tags.map(clean_tags).transpose()?,
    };

    let resource = resources_db_operations::update_resource(&conn, resource_id, &changes)?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;
    log::info!("User '{}' updated resource {}", user.username, resource_id);
    Ok(resource)
}

pub fn delete_resource(pool: &web::Data<DbPool>, user: &AuthenticatedUser, resource_id: i64) -> Result<(), AppError> {
    let conn = get_conn(pool)?;
    ensure_owner_or_admin(&conn, user, resource_id)?;
    resources_db_operations::delete_resource(&conn, resource_id)?;
    log::info!("User '{}' deleted resource {}", user.username, resource_id);
    Ok(())
}
