use std::sync::Arc;

use thiserror::Error;

use crate::models::{Cat, Identity};
use crate::store::{CatStore, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cat id must be a positive integer, got {0}")]
    InvalidId(i64),

    #[error("cat {0} already exists")]
    Conflict(i64),

    #[error("cat {0} not found")]
    NotFound(i64),

    #[error("cat {0} belongs to another author")]
    Forbidden(i64),

    #[error("author {0} is not a registered user")]
    UnknownAuthor(Identity),

    #[error(transparent)]
    Store(StoreError),
}

impl RegistryError {
    fn from_store(id: i64, err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => RegistryError::Conflict(id),
            StoreError::NotFound => RegistryError::NotFound(id),
            StoreError::Forbidden => RegistryError::Forbidden(id),
            other => RegistryError::Store(other),
        }
    }
}

/// The cat collection plus the author of each entry.
///
/// Reads never consult the caller's identity. Renames and deletes pass the
/// requester down to the backend, which checks ownership while it holds the
/// lock on the entry.
#[derive(Clone)]
pub struct ResourceRegistry {
    cats: Arc<dyn CatStore>,
    users: Arc<dyn UserStore>,
}

impl ResourceRegistry {
    pub fn new(cats: Arc<dyn CatStore>, users: Arc<dyn UserStore>) -> Self {
        Self { cats, users }
    }

    pub async fn list(&self) -> Result<Vec<Cat>, RegistryError> {
        self.cats.list_cats().await.map_err(RegistryError::Store)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Cat>, RegistryError> {
        self.cats.get_cat(id).await.map_err(RegistryError::Store)
    }

    /// Inserts a cat under a client-chosen id. `author` must be registered now;
    /// it is not re-checked later.
    pub async fn create(&self, id: i64, name: &str, author: &Identity) -> Result<Cat, RegistryError> {
        if id <= 0 {
            return Err(RegistryError::InvalidId(id));
        }

        let known = self
            .users
            .secret_for(author)
            .await
            .map_err(RegistryError::Store)?
            .is_some();
        if !known {
            return Err(RegistryError::UnknownAuthor(author.clone()));
        }

        let cat = Cat {
            id,
            name: name.to_string(),
            author: author.clone(),
        };
        let created = self.cats.insert_cat(cat).await.map_err(|e| match e {
            StoreError::UnknownAuthor => RegistryError::UnknownAuthor(author.clone()),
            other => RegistryError::from_store(id, other),
        })?;

        tracing::info!(cat_id = id, author = %author, "cat created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, name: &str, requester: &Identity) -> Result<Cat, RegistryError> {
        let updated = self
            .cats
            .rename_cat(id, name, requester)
            .await
            .map_err(|e| RegistryError::from_store(id, e))?;

        tracing::info!(cat_id = id, author = %requester, "cat renamed");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, requester: &Identity) -> Result<(), RegistryError> {
        self.cats
            .delete_cat(id, requester)
            .await
            .map_err(|e| RegistryError::from_store(id, e))?;

        tracing::info!(cat_id = id, author = %requester, "cat deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    async fn registry_with_users(users: &[&str]) -> ResourceRegistry {
        let store = Arc::new(MemoryStore::default());
        for u in users {
            store.insert_user(&Identity::from(*u), "pw").await.unwrap();
        }
        ResourceRegistry::new(store.clone(), store)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let reg = registry_with_users(&["a@x.com"]).await;
        reg.create(5, "Sphynx", &Identity::from("a@x.com")).await.unwrap();

        let cat = reg.get(5).await.unwrap().unwrap();
        assert_eq!(cat.name, "Sphynx");
        assert_eq!(cat.author, "a@x.com");
        assert!(reg.get(6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let reg = registry_with_users(&["a@x.com", "b@x.com"]).await;
        reg.create(1, "Bengal", &Identity::from("a@x.com")).await.unwrap();

        let err = reg.create(1, "Other", &Identity::from("b@x.com")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(1)));
        // first insert is untouched
        let cat = reg.get(1).await.unwrap().unwrap();
        assert_eq!(cat.name, "Bengal");
        assert_eq!(cat.author, "a@x.com");
    }

    #[tokio::test]
    async fn test_non_positive_ids_are_rejected() {
        let reg = registry_with_users(&["a@x.com"]).await;
        for id in [0, -1, i64::MIN] {
            let err = reg.create(id, "Nope", &Identity::from("a@x.com")).await.unwrap_err();
            assert!(matches!(err, RegistryError::InvalidId(_)));
        }
        assert!(reg.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_author_cannot_create() {
        let reg = registry_with_users(&[]).await;
        let err = reg.create(1, "Bengal", &Identity::from("ghost@x.com")).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownAuthor(_)));
    }

    #[tokio::test]
    async fn test_ownership_rules_for_update_and_delete() {
        let reg = registry_with_users(&["a@x.com", "b@x.com"]).await;
        let owner = Identity::from("a@x.com");
        let stranger = Identity::from("b@x.com");
        reg.create(3, "Siamese", &owner).await.unwrap();

        assert!(matches!(
            reg.update(3, "Mine now", &stranger).await,
            Err(RegistryError::Forbidden(3))
        ));
        assert!(matches!(
            reg.delete(3, &stranger).await,
            Err(RegistryError::Forbidden(3))
        ));

        let renamed = reg.update(3, "Siamese II", &owner).await.unwrap();
        assert_eq!(renamed.name, "Siamese II");
        assert_eq!(renamed.author, owner);

        reg.delete(3, &owner).await.unwrap();
        assert!(reg.get(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let reg = registry_with_users(&["a@x.com"]).await;
        let who = Identity::from("a@x.com");
        assert!(matches!(reg.update(9, "x", &who).await, Err(RegistryError::NotFound(9))));
        assert!(matches!(reg.delete(9, &who).await, Err(RegistryError::NotFound(9))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deletes_have_one_winner() {
        let reg = registry_with_users(&["a@x.com"]).await;
        let owner = Identity::from("a@x.com");
        reg.create(42, "Maine Coon", &owner).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let reg = reg.clone();
            let owner = owner.clone();
            handles.push(tokio::spawn(async move { reg.delete(42, &owner).await }));
        }

        let mut ok = 0;
        let mut not_found = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => ok += 1,
                Err(RegistryError::NotFound(42)) => not_found += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(not_found, 31);
    }
}
