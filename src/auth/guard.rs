//! Authorization guard: bearer header → identity, and the ownership rule.
//!
//! Handlers receive identities through the [`Authenticated`] and
//! [`MaybeAuthenticated`] extractors. Ownership is enforced by the storage
//! backends through [`authorize_ownership`], inside the same critical section
//! as the mutation it protects.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use thiserror::Error;

use super::credentials::CredentialStore;
use super::token::TokenService;
use crate::errors::AppError;
use crate::models::{Cat, Identity};
use crate::AppState;

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Missing header, wrong scheme, or any token validation failure.
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("requester is not the author of this resource")]
    NotOwner,

    #[error("identity lookup failed: {0}")]
    Backend(String),
}

/// Succeeds iff `identity` authored `cat`.
pub fn authorize_ownership(identity: &Identity, cat: &Cat) -> Result<(), AuthError> {
    if cat.author == *identity {
        Ok(())
    } else {
        Err(AuthError::NotOwner)
    }
}

#[derive(Clone)]
pub struct AuthGuard {
    tokens: Arc<TokenService>,
    credentials: CredentialStore,
    recheck_subject: bool,
}

impl AuthGuard {
    /// `recheck_subject` additionally rejects tokens whose subject is no longer
    /// (or was never) registered. Off by default: tokens stay stateless.
    pub fn new(tokens: Arc<TokenService>, credentials: CredentialStore, recheck_subject: bool) -> Self {
        Self {
            tokens,
            credentials,
            recheck_subject,
        }
    }

    /// Resolves the caller from the raw `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let identity = self.tokens.validate(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AuthError::Unauthenticated
        })?;

        if self.recheck_subject {
            let known = self
                .credentials
                .exists(&identity)
                .await
                .map_err(|e| AuthError::Backend(e.to_string()))?;
            if !known {
                tracing::debug!(email = %identity, "token subject is not registered");
                return Err(AuthError::Unauthenticated);
            }
        }

        Ok(identity)
    }
}

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Extractor for routes that require a bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = state.guard.authenticate(authorization_header(parts)).await?;
        Ok(Authenticated(identity))
    }
}

/// Extractor for the list route: authenticates only when the deployment
/// requires it (`CATTERY_LIST_REQUIRES_AUTH`).
#[derive(Debug, Clone)]
pub struct MaybeAuthenticated(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeAuthenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !state.config.list_requires_auth {
            return Ok(MaybeAuthenticated(None));
        }
        let identity = state.guard.authenticate(authorization_header(parts)).await?;
        Ok(MaybeAuthenticated(Some(identity)))
    }
}
