use async_trait::async_trait;
use sqlx::PgPool;

use super::{CatStore, StoreError, UserStore};
use crate::auth::guard::authorize_ownership;
use crate::models::{Cat, Identity};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps constraint violations onto the store's domain errors.
fn classify(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::UnknownAuthor;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, identity: &Identity, secret: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (email, secret) VALUES ($1, $2)")
            .bind(identity)
            .bind(secret)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn secret_for(&self, identity: &Identity) -> Result<Option<String>, StoreError> {
        let secret = sqlx::query_scalar::<_, String>("SELECT secret FROM users WHERE email = $1")
            .bind(identity)
            .fetch_optional(&self.pool)
            .await?;
        Ok(secret)
    }

    async fn list_users(&self) -> Result<Vec<Identity>, StoreError> {
        let users = sqlx::query_scalar::<_, Identity>("SELECT email FROM users ORDER BY email ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}

#[async_trait]
impl CatStore for PgStore {
    async fn list_cats(&self) -> Result<Vec<Cat>, StoreError> {
        let rows = sqlx::query_as::<_, Cat>("SELECT id, name, author FROM cats ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_cat(&self, id: i64) -> Result<Option<Cat>, StoreError> {
        let row = sqlx::query_as::<_, Cat>("SELECT id, name, author FROM cats WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_cat(&self, cat: Cat) -> Result<Cat, StoreError> {
        let row = sqlx::query_as::<_, Cat>(
            "INSERT INTO cats (id, name, author) VALUES ($1, $2, $3) RETURNING id, name, author",
        )
        .bind(cat.id)
        .bind(&cat.name)
        .bind(&cat.author)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        Ok(row)
    }

    async fn rename_cat(&self, id: i64, name: &str, requester: &Identity) -> Result<Cat, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock held until commit; concurrent renames/deletes of the same id queue here.
        let current = sqlx::query_as::<_, Cat>(
            "SELECT id, name, author FROM cats WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        authorize_ownership(requester, &current).map_err(|_| StoreError::Forbidden)?;

        let updated = sqlx::query_as::<_, Cat>(
            "UPDATE cats SET name = $2, updated_at = now() WHERE id = $1 RETURNING id, name, author",
        )
        .bind(id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_cat(&self, id: i64, requester: &Identity) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Cat>(
            "SELECT id, name, author FROM cats WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        authorize_ownership(requester, &current).map_err(|_| StoreError::Forbidden)?;

        sqlx::query("DELETE FROM cats WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
