use crate::error::{AppError, AuthError};
use crate::helper::get_conn;
use crate::models::db_operations::users_db_operations;
use crate::{AppState, DbPool};
use actix_web::{dev, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// The caller behind a valid, unrevoked bearer token.
///
/// `is_admin` comes from the users table, not from the token claim, so a role
/// change applies to tokens that were issued before it.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    /// Token id recorded in the revocation store on logout.
    pub jti: String,
    /// Unix expiry of the presented token; revocation entries live until then.
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn owns_or_admin(&self, owner_id: i64) -> bool {
        self.is_admin || self.id == owner_id
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::MissingToken),
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("AppState is not registered".to_string()))?;
    let pool = req
        .app_data::<web::Data<DbPool>>()
        .ok_or_else(|| AppError::Internal("DbPool is not registered".to_string()))?;

    let token = bearer_token(req)?;
    let claims = state.jwt.verify(token)?;
    if state.revoked_tokens.is_revoked(&claims.jti)? {
        return Err(AuthError::Revoked.into());
    }

    let user_id = claims.user_id()?;
    let conn = get_conn(pool)?;
    let user = users_db_operations::read_user_by_id(&conn, user_id)?.ok_or(AuthError::Invalid)?;

    Ok(AuthenticatedUser {
        id: user.id,
        username: user.username,
        is_admin: user.is_admin,
        jti: claims.jti,
        expires_at: claims.exp,
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// An authenticated caller whose account currently holds the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let result = authenticate(req).and_then(|user| {
            if user.is_admin {
                Ok(AdminUser(user))
            } else {
                log::warn!("User '{}' was denied access to {}", user.username, req.path());
                Err(AppError::forbidden("Admin privileges required"))
            }
        });
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn bearer_token_requires_the_scheme() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwdw=="))
            .to_http_request();
        assert_eq!(bearer_token(&req).unwrap_err(), AuthError::MissingToken);

        let req = TestRequest::default().to_http_request();
        assert_eq!(bearer_token(&req).unwrap_err(), AuthError::MissingToken);
    }
}
