use crate::error::AppError;
use crate::DbPool;
use actix_web::web;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

pub mod admin_helpers;
pub mod auth_helpers;
pub mod comment_helpers;
pub mod post_helpers;
pub mod resource_helpers;
pub mod token_helpers;
pub mod user_helpers;
pub mod validation_helpers;

// Helper to get a connection from the pool
pub fn get_conn(pool: &web::Data<DbPool>) -> Result<PooledConnection<SqliteConnectionManager>, AppError> {
    pool.get().map_err(AppError::Pool)
}
