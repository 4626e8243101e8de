//! Secret schemes for stored credentials.
//!
//! `Plain` stores the secret as given and compares in constant time.
//! `Argon2` stores an argon2id PHC string with a random salt.

use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretScheme {
    Plain,
    #[default]
    Argon2,
}

impl FromStr for SecretScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" => Ok(SecretScheme::Plain),
            "argon2" => Ok(SecretScheme::Argon2),
            other => Err(format!("unknown password scheme '{}', expected plain or argon2", other)),
        }
    }
}

impl SecretScheme {
    /// Produces the value to persist for `secret`.
    pub fn seal(&self, secret: &str) -> Result<String, String> {
        match self {
            SecretScheme::Plain => Ok(secret.to_string()),
            SecretScheme::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(secret.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| format!("failed to hash password: {e}"))
            }
        }
    }

    /// Checks `secret` against a value produced by [`SecretScheme::seal`].
    ///
    /// Returns `Err` only when the stored value is unreadable for this scheme.
    pub fn matches(&self, secret: &str, stored: &str) -> Result<bool, String> {
        match self {
            SecretScheme::Plain => Ok(bool::from(secret.as_bytes().ct_eq(stored.as_bytes()))),
            SecretScheme::Argon2 => {
                let parsed = PasswordHash::new(stored)
                    .map_err(|e| format!("invalid password hash format: {e}"))?;
                Ok(Argon2::default()
                    .verify_password(secret.as_bytes(), &parsed)
                    .is_ok())
            }
        }
    }
}
