use crate::error::{AppError, AuthError};
use crate::helper::get_conn;
use crate::helper::validation_helpers::{is_valid_email, required};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{is_unique_violation, users_db_operations};
use crate::models::User;
use crate::{AppState, DbPool};
use actix_web::web;

pub struct Registration<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
}

pub fn register_user(
    pool: &web::Data<DbPool>,
    state: &web::Data<AppState>,
    form: Registration<'_>,
) -> Result<User, AppError> {
    let message = "Username, email and password are required";
    let username = required(form.username, message)?;
    let email = required(form.email, message)?;
    let password = match form.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(AppError::validation(message)),
    };
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email format"));
    }

    let mut conn = get_conn(pool)?;
    if users_db_operations::username_or_email_taken(&conn, &username, &email)? {
        return Err(AppError::conflict("Username or email already exists"));
    }

    // A concurrent registration can still win the race; the UNIQUE constraint decides.
    match users_db_operations::create_user(&mut conn, &username, &email, password, false, state.password_hash_cost) {
        Ok(user) => {
            log::info!("Registered new user '{}' (id {})", user.username, user.id);
            Ok(user)
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::conflict("Username or email already exists")),
        Err(e) => Err(e.into()),
    }
}

/// Verifies credentials and returns the user with a freshly issued token.
pub fn login_user(
    pool: &web::Data<DbPool>,
    state: &web::Data<AppState>,
    login: Option<&str>,
    password: Option<&str>,
) -> Result<(User, String), AppError> {
    let login = required(login, "Username and password are required")?;
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("Username and password are required"))?;

    let conn = get_conn(pool)?;
    match users_db_operations::verify_credentials(&conn, &login, password)? {
        Some(user) => {
            let token = state.jwt.issue(&user)?;
            log::info!("User '{}' logged in", user.username);
            Ok((user, token))
        }
        None => {
            log::warn!("Failed login attempt for '{}'", login);
            Err(AuthError::BadCredentials.into())
        }
    }
}

pub fn logout_user(state: &web::Data<AppState>, user: &AuthenticatedUser) -> Result<(), AppError> {
    state.revoked_tokens.revoke(&user.jti, user.expires_at)?;
    log::info!("User '{}' logged out", user.username);
    Ok(())
}
