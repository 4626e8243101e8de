//! Demo fixture: one user owning three cats.

use crate::auth::{CredentialError, CredentialStore};
use crate::models::Identity;
use crate::registry::{RegistryError, ResourceRegistry};

pub const DEMO_EMAIL: &str = "admin@example.com";
pub const DEMO_PASSWORD: &str = "admin";

const DEMO_CATS: [(i64, &str); 3] = [(1, "Bengal"), (2, "British Shorthair"), (3, "Siamese")];

/// Loads the fixture, leaving any entry that already exists as it is.
pub async fn demo(credentials: &CredentialStore, registry: &ResourceRegistry) -> anyhow::Result<()> {
    let admin = Identity::from(DEMO_EMAIL);

    match credentials.register(&admin, DEMO_PASSWORD).await {
        Ok(()) | Err(CredentialError::AlreadyExists) => {}
        Err(e) => return Err(anyhow::anyhow!("seeding demo user failed: {e}")),
    }

    let mut created = 0;
    for (id, name) in DEMO_CATS {
        match registry.create(id, name, &admin).await {
            Ok(_) => created += 1,
            Err(RegistryError::Conflict(_)) => {}
            Err(e) => return Err(anyhow::anyhow!("seeding cat {id} failed: {e}")),
        }
    }

    tracing::info!(email = DEMO_EMAIL, cats = created, "demo fixture loaded");
    Ok(())
}
