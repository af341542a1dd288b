use crate::error::AppError;
use crate::helper::get_conn;
use crate::middleware::AdminUser;
use crate::models::db_operations::resources_db_operations;
use crate::models::db_operations::users_db_operations::{self, RoleChange};
use crate::models::{PublicUser, User};
use crate::DbPool;
use actix_web::web;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A user as listed on the admin dashboard.
#[derive(Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: PublicUser,
    pub registration_date: DateTime<Utc>,
}

impl From<&User> for AdminUserView {
    fn from(user: &User) -> Self {
        AdminUserView {
            user: PublicUser::from(user),
            registration_date: user.created_at,
        }
    }
}

pub fn fetch_all_users(pool: &web::Data<DbPool>) -> Result<Vec<AdminUserView>, AppError> {
    let conn = get_conn(pool)?;
    let users = users_db_operations::read_all_users(&conn)?;
    Ok(users.iter().map(AdminUserView::from).collect())
}

pub fn delete_any_resource(pool: &web::Data<DbPool>, admin: &AdminUser, resource_id: i64) -> Result<(), AppError> {
    let conn = get_conn(pool)?;
    if resources_db_operations::delete_resource(&conn, resource_id)? == 0 {
        return Err(AppError::not_found("Resource not found"));
    }
    log::info!("Admin '{}' deleted resource {}", admin.0.username, resource_id);
    Ok(())
}

/// Grants or revokes the admin flag. An admin may not change their own role,
/// and the last admin may not be demoted.
pub fn change_user_role(
    pool: &web::Data<DbPool>,
    admin: &AdminUser,
    target_id: i64,
    is_admin: bool,
) -> Result<User, AppError> {
    if admin.0.id == target_id {
        log::warn!("Admin '{}' tried to change their own role", admin.0.username);
        return Err(AppError::forbidden("You cannot change your own role"));
    }

    let mut conn = get_conn(pool)?;
    match users_db_operations::set_admin_flag(&mut conn, target_id, is_admin)? {
        RoleChange::Updated(user) => {
            log::info!(
                "Admin '{}' set is_admin={} for user '{}'",
                admin.0.username,
                is_admin,
                user.username
            );
            Ok(user)
        }
        RoleChange::NotFound => Err(AppError::not_found("User not found")),
        RoleChange::LastAdmin => Err(AppError::validation("Cannot demote the last remaining admin")),
    }
}
