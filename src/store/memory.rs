use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{CatStore, StoreError, UserStore};
use crate::auth::guard::authorize_ownership;
use crate::models::{Cat, Identity};

/// Process-local backend. Every check-then-act goes through `DashMap::entry`,
/// which holds the shard write lock until the entry guard is dropped.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Identity, String>,
    cats: DashMap<i64, Cat>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, identity: &Identity, secret: &str) -> Result<(), StoreError> {
        match self.users.entry(identity.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(secret.to_string());
                Ok(())
            }
        }
    }

    async fn secret_for(&self, identity: &Identity) -> Result<Option<String>, StoreError> {
        Ok(self.users.get(identity).map(|s| s.value().clone()))
    }

    async fn list_users(&self) -> Result<Vec<Identity>, StoreError> {
        let mut users: Vec<Identity> = self.users.iter().map(|e| e.key().clone()).collect();
        users.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(users)
    }
}

#[async_trait]
impl CatStore for MemoryStore {
    async fn list_cats(&self) -> Result<Vec<Cat>, StoreError> {
        let mut cats: Vec<Cat> = self.cats.iter().map(|e| e.value().clone()).collect();
        cats.sort_by_key(|c| c.id);
        Ok(cats)
    }

    async fn get_cat(&self, id: i64) -> Result<Option<Cat>, StoreError> {
        Ok(self.cats.get(&id).map(|c| c.value().clone()))
    }

    async fn insert_cat(&self, cat: Cat) -> Result<Cat, StoreError> {
        match self.cats.entry(cat.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(cat.clone());
                Ok(cat)
            }
        }
    }

    async fn rename_cat(&self, id: i64, name: &str, requester: &Identity) -> Result<Cat, StoreError> {
        match self.cats.entry(id) {
            Entry::Vacant(_) => Err(StoreError::NotFound),
            Entry::Occupied(mut slot) => {
                authorize_ownership(requester, slot.get()).map_err(|_| StoreError::Forbidden)?;
                slot.get_mut().name = name.to_string();
                Ok(slot.get().clone())
            }
        }
    }

    async fn delete_cat(&self, id: i64, requester: &Identity) -> Result<(), StoreError> {
        match self.cats.entry(id) {
            Entry::Vacant(_) => Err(StoreError::NotFound),
            Entry::Occupied(slot) => {
                authorize_ownership(requester, slot.get()).map_err(|_| StoreError::Forbidden)?;
                slot.remove();
                Ok(())
            }
        }
    }
}
