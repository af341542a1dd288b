use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use helper::token_helpers::JwtKeys;
use models::db_operations::revocation_db_operations::RevocationStore;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared by every worker: token keys, the revocation store and the hashing cost.
pub struct AppState {
    pub jwt: JwtKeys,
    pub revoked_tokens: Arc<dyn RevocationStore>,
    pub password_hash_cost: u32,
}

/// Opens a pool whose connections enforce foreign keys and wait on a busy database.
pub fn build_pool(db_path: &Path) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    });
    Pool::builder().build(manager)
}

pub mod config;
pub mod error;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
