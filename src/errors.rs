use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::{AuthError, CredentialError, TokenError};
use crate::registry::RegistryError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not the author")]
    NotOwner,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("already registered")]
    AlreadyExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            other => AppError::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::AlreadyExists => AppError::AlreadyExists,
            CredentialError::InvalidCredentials => AppError::InvalidCredentials,
            CredentialError::Secret(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            CredentialError::Store(e) => e.into(),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            _ => AppError::Unauthenticated,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => AppError::Unauthenticated,
            AuthError::NotOwner => AppError::NotOwner,
            AuthError::Backend(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId(_) => AppError::Validation(err.to_string()),
            RegistryError::Conflict(_) => AppError::Conflict(err.to_string()),
            RegistryError::NotFound(_) => AppError::NotFound(err.to_string()),
            RegistryError::Forbidden(_) => AppError::NotOwner,
            // token named a user that is not (or no longer) registered
            RegistryError::UnknownAuthor(_) => AppError::Unauthenticated,
            RegistryError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "validation_failed",
                msg.clone(),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unauthenticated",
                "invalid or missing bearer token".to_string(),
            ),
            AppError::NotOwner => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "not_owner",
                "you are not the author of this cat".to_string(),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "not_found",
                msg.clone(),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "conflict_error",
                "conflict",
                msg.clone(),
            ),
            AppError::AlreadyExists => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "already_exists",
                "this email is already registered".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "authentication_error",
                "invalid_credentials",
                "wrong email or password".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        if matches!(self, AppError::Unauthenticated) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_status_codes() {
        assert_eq!(status_of(CredentialError::AlreadyExists), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(CredentialError::InvalidCredentials), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(status_of(TokenError::Expired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(RegistryError::InvalidId(0)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(RegistryError::Conflict(1)), StatusCode::CONFLICT);
        assert_eq!(status_of(RegistryError::NotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(RegistryError::Forbidden(1)), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(RegistryError::UnknownAuthor(Identity::from("ghost@x.com"))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AuthError::Backend("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthenticated_carries_challenge() {
        let resp = AppError::Unauthenticated.into_response();
        assert_eq!(resp.headers().get("www-authenticate").unwrap(), "Bearer");
    }
}
