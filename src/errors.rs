use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::repository::RepositoryError;

/// ApiError
///
/// The full error taxonomy of the API. Every handler-level failure is expressed as
/// one of these variants and rendered as a JSON body of the form
/// `{ "message": "..." }` with the matching HTTP status code.
///
/// Note that `Conflict` maps to 400, not 409: duplicate usernames and subject
/// codes are reported as bad requests on the wire.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400: a required field was missing or empty.
    #[error("{0}")]
    Validation(String),
    /// 400: a unique field (username, subject code) collided with an existing record.
    #[error("{0}")]
    Conflict(String),
    /// 401: bad credentials, or no bearer token on a protected route.
    #[error("{0}")]
    Unauthorized(String),
    /// 403: a bearer token was presented but failed signature or expiry checks.
    #[error("{0}")]
    Forbidden(String),
    /// 404: no record with the given id, or no such route.
    #[error("{0}")]
    NotFound(String),
    /// 405: wrong HTTP method on an otherwise valid path.
    #[error("{0}")]
    MethodNotAllowed(String),
    /// 500: database, hashing, or token-signing failure. The detail is logged but
    /// never sent to the client.
    #[error("Server error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "request failed with server error");
        }

        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Repository failures cross the handler boundary here: a duplicate-key write on a
/// unique index becomes a Conflict, everything else is an opaque server error.
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(field) => {
                ApiError::Conflict(format!("{field} already taken"))
            }
            RepositoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("password hashing failed: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("token signing failed: {err}"))
    }
}
