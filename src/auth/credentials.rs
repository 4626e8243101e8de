use std::sync::Arc;

use thiserror::Error;

use super::password::SecretScheme;
use crate::models::Identity;
use crate::store::{StoreError, UserStore};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("identity already registered")]
    AlreadyExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("secret handling failed: {0}")]
    Secret(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => CredentialError::AlreadyExists,
            other => CredentialError::Store(other),
        }
    }
}

/// Hashing is CPU-bound; keep it off the async workers.
async fn off_runtime<T, F>(work: F) -> Result<T, CredentialError>
where
    F: FnOnce() -> Result<T, String> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CredentialError::Secret(e.to_string()))?
        .map_err(CredentialError::Secret)
}

/// Identity → secret mapping with login verification.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
    scheme: SecretScheme,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>, scheme: SecretScheme) -> Self {
        Self { users, scheme }
    }

    /// Registers a new identity. No complexity rules apply to the secret.
    pub async fn register(&self, identity: &Identity, secret: &str) -> Result<(), CredentialError> {
        let scheme = self.scheme;
        let secret = secret.to_owned();
        let sealed = off_runtime(move || scheme.seal(&secret)).await?;
        self.users.insert_user(identity, &sealed).await?;
        tracing::info!(email = %identity, "user registered");
        Ok(())
    }

    /// Succeeds iff `identity` is registered and `secret` matches what it registered with.
    pub async fn verify(&self, identity: &Identity, secret: &str) -> Result<(), CredentialError> {
        let Some(stored) = self.users.secret_for(identity).await? else {
            tracing::debug!(email = %identity, "sign-in for unknown identity");
            return Err(CredentialError::InvalidCredentials);
        };

        let scheme = self.scheme;
        let secret = secret.to_owned();
        if off_runtime(move || scheme.matches(&secret, &stored)).await? {
            Ok(())
        } else {
            tracing::debug!(email = %identity, "sign-in with wrong secret");
            Err(CredentialError::InvalidCredentials)
        }
    }

    pub async fn exists(&self, identity: &Identity) -> Result<bool, CredentialError> {
        Ok(self.users.secret_for(identity).await?.is_some())
    }

    pub async fn identities(&self) -> Result<Vec<Identity>, CredentialError> {
        Ok(self.users.list_users().await?)
    }
}
