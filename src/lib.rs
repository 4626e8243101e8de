//! cattery: token-authenticated, ownership-scoped cat registry.
//!
//! The binary in `main.rs` wires configuration, tracing and the CLI around
//! this library; integration tests in `tests/` drive it directly.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod registry;
pub mod seed;
pub mod store;

use auth::{AuthGuard, Clock, CredentialStore, TokenService};
use registry::ResourceRegistry;
use store::Backends;

/// Shared application state passed to handlers and extractors.
pub struct AppState {
    pub credentials: CredentialStore,
    pub tokens: Arc<TokenService>,
    pub guard: AuthGuard,
    pub registry: ResourceRegistry,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config, backends: Backends, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::new(&config.jwt_secret, clock)?);
        let credentials = CredentialStore::new(backends.users.clone(), config.password_scheme);
        let guard = AuthGuard::new(tokens.clone(), credentials.clone(), config.recheck_subject);
        let registry = ResourceRegistry::new(backends.cats, backends.users);

        Ok(Self {
            credentials,
            tokens,
            guard,
            registry,
            config,
        })
    }
}
