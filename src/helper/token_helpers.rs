use crate::error::{AppError, AuthError};
use crate::models::User;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub is_admin: bool,
    /// Unique token id, the key of the revocation store.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::Invalid)
    }
}

/// HS256 keys plus the access-token lifetime.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        self.issue_with_window(user, now, now + self.ttl_seconds)
    }

    pub fn issue_with_window(&self, user: &User, issued_at: i64, expires_at: i64) -> Result<String, AppError> {
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            is_admin: user.is_admin,
            jti: Uuid::new_v4().to_string(),
            iat: issued_at,
            exp: expires_at,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Checks signature and expiry. Revocation is checked by the caller.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user() -> User {
        User {
            id: 7,
            username: "zeng".to_string(),
            email: "zeng@example.com".to_string(),
            password_hash: String::new(),
            is_admin: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            avatar: None,
        }
    }

    #[test]
    fn issued_token_carries_identity_claims() {
        let keys = JwtKeys::new("a-test-secret-that-is-long-enough!!", 3600);
        let claims = keys.verify(&keys.issue(&user()).unwrap()).unwrap();

        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.username, "zeng");
        assert!(claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn each_token_gets_a_fresh_jti() {
        let keys = JwtKeys::new("a-test-secret-that-is-long-enough!!", 3600);
        let a = keys.verify(&keys.issue(&user()).unwrap()).unwrap();
        let b = keys.verify(&keys.issue(&user()).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn expired_token_is_distinguished_from_invalid() {
        let keys = JwtKeys::new("a-test-secret-that-is-long-enough!!", 3600);
        let now = Utc::now().timestamp();
        let stale = keys.issue_with_window(&user(), now - 7200, now - 3600).unwrap();
        assert_eq!(keys.verify(&stale).unwrap_err(), AuthError::Expired);

        let other = JwtKeys::new("a-different-secret-also-long-enough", 3600);
        let forged = other.issue(&user()).unwrap();
        assert_eq!(keys.verify(&forged).unwrap_err(), AuthError::Invalid);
        assert_eq!(keys.verify("not.a.jwt").unwrap_err(), AuthError::Invalid);
    }
}
