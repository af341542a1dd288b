use crate::error::AppError;
use crate::helper::get_conn;
use crate::helper::validation_helpers::optional_non_blank;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{is_unique_violation, users_db_operations};
use crate::models::User;
use crate::DbPool;
use actix_web::web;

fn ensure_self_or_admin(user: &AuthenticatedUser, target_id: i64) -> Result<(), AppError> {
    if user.owns_or_admin(target_id) {
        Ok(())
    } else {
        log::warn!("User '{}' tried to access the profile of user {}", user.username, target_id);
        Err(AppError::forbidden("You can only access your own profile"))
    }
}

pub fn fetch_profile(pool: &web::Data<DbPool>, user: &AuthenticatedUser, target_id: i64) -> Result<User, AppError> {
    let conn = get_conn(pool)?;
    let profile = users_db_operations::read_user_by_id(&conn, target_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    ensure_self_or_admin(user, target_id)?;
    Ok(profile)
}

pub fn update_profile(
    pool: &web::Data<DbPool>,
    user: &AuthenticatedUser,
    target_id: i64,
    username: Option<&str>,
    avatar: Option<Option<&str>>,
) -> Result<User, AppError> {
    let conn = get_conn(pool)?;
    if users_db_operations::read_user_by_id(&conn, target_id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    ensure_self_or_admin(user, target_id)?;
    let username = optional_non_blank(username, "Username cannot be empty")?;
    if let Some(name) = &username {
        if users_db_operations::username_taken_by_other(&conn, name, target_id)? {
            return Err(AppError::conflict("Username already exists"));
        }
    }

    match users_db_operations::update_profile(&conn, target_id, username.as_deref(), avatar) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(AppError::conflict("Username already exists")),
        Err(e) => return Err(e.into()),
    }
    log::info!("Profile of user {} updated by '{}'", target_id, user.username);

    users_db_operations::read_user_by_id(&conn, target_id)?
        .ok_or_else(|| AppError::not_found("User not found"))
}
