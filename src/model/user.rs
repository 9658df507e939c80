use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// argon2 PHC string, never the plaintext
    #[serde(skip_serializing)]
    pub password: String,
    pub is_admin: bool,
    pub department_id: Option<u64>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_is_admin(self.is_admin)
    }
}

/// Account about to be inserted; `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub department_id: Option<u64>,
}
