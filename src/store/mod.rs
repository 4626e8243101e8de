//! Storage backends behind the credential store and the cat registry.
//!
//! Two implementations exist: [`memory::MemoryStore`] (DashMap, used when no
//! database is configured and in tests) and [`postgres::PgStore`]. Both
//! perform check-then-act under a per-id lock: the DashMap shard lock for an
//! entry, or a `SELECT ... FOR UPDATE` row lock in Postgres.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;
use crate::models::{Cat, Identity};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key already exists")]
    Duplicate,

    #[error("not found")]
    NotFound,

    #[error("requester is not the author")]
    Forbidden,

    #[error("author is not a registered user")]
    UnknownAuthor,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Fails with [`StoreError::Duplicate`] if the
    /// identity is already present; the check and the insert are atomic.
    async fn insert_user(&self, identity: &Identity, secret: &str) -> Result<(), StoreError>;

    /// Returns the stored secret (plain or PHC hash, depending on scheme).
    async fn secret_for(&self, identity: &Identity) -> Result<Option<String>, StoreError>;

    async fn list_users(&self) -> Result<Vec<Identity>, StoreError>;
}

#[async_trait]
pub trait CatStore: Send + Sync {
    /// All cats, ordered by id.
    async fn list_cats(&self) -> Result<Vec<Cat>, StoreError>;

    async fn get_cat(&self, id: i64) -> Result<Option<Cat>, StoreError>;

    async fn insert_cat(&self, cat: Cat) -> Result<Cat, StoreError>;

    /// Renames the cat if `requester` is its author.
    async fn rename_cat(&self, id: i64, name: &str, requester: &Identity) -> Result<Cat, StoreError>;

    /// Removes the cat if `requester` is its author.
    async fn delete_cat(&self, id: i64, requester: &Identity) -> Result<(), StoreError>;
}

/// Opened backend, shared by the credential store and the registry.
pub struct Backends {
    pub users: Arc<dyn UserStore>,
    pub cats: Arc<dyn CatStore>,
}

impl Backends {
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self {
            users: store.clone(),
            cats: store,
        }
    }
}

/// Opens the configured database and refuses the in-memory fallback.
///
/// Operator commands run once and exit, so anything they wrote to memory would
/// be gone before the server ever saw it.
pub async fn open_persistent(cfg: &Config) -> anyhow::Result<Backends> {
    if cfg.database_url.is_none() {
        anyhow::bail!("DATABASE_URL is not set; this command needs a database to write to");
    }
    open(cfg).await
}

/// Picks Postgres when `DATABASE_URL` is configured, otherwise the in-memory store.
pub async fn open(cfg: &Config) -> anyhow::Result<Backends> {
    match cfg.database_url.as_deref() {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db = postgres::PgStore::connect(url).await?;

            tracing::info!("Running migrations...");
            db.migrate().await?;

            let db = Arc::new(db);
            Ok(Backends {
                users: db.clone(),
                cats: db,
            })
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using the in-memory store (data is lost on exit)");
            Ok(Backends::in_memory())
        }
    }
}
