use serde::{Deserialize, Serialize};

use super::Identity;

/// A registered cat. `id` is chosen by the client on creation, `name` is the
/// only field that changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cat {
    pub id: i64,
    pub name: String,
    pub author: Identity,
}

/// Body of `POST /cats/`.
#[derive(Debug, Deserialize)]
pub struct NewCat {
    pub id: i64,
    pub name: String,
}

/// Body of `PUT /cat/:id`.
#[derive(Debug, Deserialize)]
pub struct RenameCat {
    pub name: String,
}
