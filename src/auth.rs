use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, errors::ApiError, models::UserDoc};

/// Bearer tokens are valid for one hour from issuance.
const TOKEN_TTL_SECS: i64 = 3600;

/// Claims
///
/// The payload signed into every bearer token. Validated on every request to a
/// protected route; `exp` is always enforced.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    /// Username at the time of issuance, carried so protected handlers can
    /// identify the caller without a store lookup.
    pub username: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiry timestamp. Tokens older than one hour are rejected.
    pub exp: usize,
}

/// Signs a one-hour bearer token for the given user.
pub fn issue_token(user: &UserDoc, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decodes and validates a bearer token. Any failure (bad signature, malformed
/// structure, expiry) is a Forbidden; the caller distinguishes a *missing* token
/// separately as Unauthorized.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Forbidden("Token expired".to_string()),
            _ => ApiError::Forbidden("Invalid token".to_string()),
        })?;

    Ok(token_data.claims)
}

/// Hashes a plaintext password with bcrypt at the default cost.
pub fn hash_password(plaintext: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)
}

/// Constant-time comparison of a plaintext candidate against a stored hash.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(plaintext, hash)
}

/// AuthUser
///
/// The resolved identity of an authenticated request, extracted from the bearer
/// token claims. Protected handlers take this as an argument; requests that fail
/// extraction never reach them.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// AuthUser extractor
///
/// Implements axum's FromRequestParts so AuthUser can appear as a handler
/// argument. The flow is:
/// 1. pull the Authorization header; absence is 401 (no token presented),
/// 2. strip the "Bearer " prefix,
/// 3. decode and validate the JWT against the configured secret; any failure
///    there is 403 (a token was presented but is not acceptable).
///
/// Identity comes from the claims alone; no store lookup happens on this path.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let claims = verify_token(token, &config.jwt_secret)?;

        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> UserDoc {
        UserDoc {
            id: Uuid::new_v4(),
            first_name: "A".into(),
            last_name: "B".into(),
            username: "ab".into(),
            password: "irrelevant".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let user = sample_user();
        let token = issue_token(&user, "secret").unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ab");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&sample_user(), "secret").unwrap();
        let err = verify_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "ab".into(),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let err = verify_token(&token, "secret").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let err = verify_token("not.a.jwt", "secret").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn password_hash_verifies_and_differs_from_plaintext() {
        let hash = hash_password("p").unwrap();
        assert_ne!(hash, "p");
        assert!(verify_password("p", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
