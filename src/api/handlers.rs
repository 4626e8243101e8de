use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::extract::{ApiJson, ApiPath};
use crate::auth::{Authenticated, MaybeAuthenticated, TOKEN_TTL_SECS};
use crate::errors::AppError;
use crate::models::cat::{NewCat, RenameCat};
use crate::models::{Cat, Identity};
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub email: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

fn require_email(email: &str) -> Result<Identity, AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email must not be empty".into()));
    }
    Ok(Identity::from(email))
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /register/: create a user
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let identity = require_email(&payload.email)?;
    state.credentials.register(&identity, &payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            email: identity.to_string(),
        }),
    ))
}

/// POST /signin/: exchange email/password for a bearer token
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let identity = require_email(&payload.email)?;
    state.credentials.verify(&identity, &payload.password).await?;

    let token = state.tokens.issue(&identity)?;
    tracing::info!(email = %identity, "token issued");

    Ok(Json(SignInResponse {
        token,
        token_type: "Bearer",
        expires_in: TOKEN_TTL_SECS,
    }))
}

/// GET /cats/: list every cat
pub async fn list_cats(
    State(state): State<Arc<AppState>>,
    MaybeAuthenticated(_caller): MaybeAuthenticated,
) -> Result<Json<Vec<Cat>>, AppError> {
    Ok(Json(state.registry.list().await?))
}

/// GET /cat/:id: read one cat, no authentication
pub async fn get_cat(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Cat>, AppError> {
    state
        .registry
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("cat {} not found", id)))
}

/// POST /cats/: create a cat authored by the caller
pub async fn create_cat(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    ApiJson(payload): ApiJson<NewCat>,
) -> Result<(StatusCode, Json<Cat>), AppError> {
    let cat = state
        .registry
        .create(payload.id, &payload.name, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(cat)))
}

/// PUT /cat/:id: rename a cat the caller authored
pub async fn put_cat(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<RenameCat>,
) -> Result<Json<Cat>, AppError> {
    let cat = state.registry.update(id, &payload.name, &caller).await?;
    Ok(Json(cat))
}

/// DELETE /cat/:id: remove a cat the caller authored
pub async fn delete_cat(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    state.registry.delete(id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}
