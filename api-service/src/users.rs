use std::collections::HashMap;

use anyhow::{anyhow, Result};
use api_auth::Identity;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand_core::OsRng;
use uuid::Uuid;

use crate::config::SeedUser;

/// Credential check performed before a token is issued.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the identity when `password` matches the account for `email`.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Identity>>;
}

struct StoredUser {
    identity: Identity,
    password_hash: String,
}

/// Directory backed by argon2 hashes held in memory.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, StoredUser>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: &[SeedUser]) -> Result<Self> {
        let mut directory = Self::new();
        for user in seed {
            directory.add_user(&user.email, &user.password, user.name.as_deref())?;
        }
        Ok(directory)
    }

    pub fn add_user(&mut self, email: &str, password: &str, name: Option<&str>) -> Result<Identity> {
        let email = email.trim().to_ascii_lowercase();
        let mut identity = Identity::new(Uuid::new_v4().to_string(), email.clone());
        if let Some(name) = name {
            identity = identity.with_name(name);
        }
        let password_hash = hash_password(password)?;
        self.users.insert(
            email,
            StoredUser {
                identity: identity.clone(),
                password_hash,
            },
        );
        Ok(identity)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Identity>> {
        let key = email.trim().to_ascii_lowercase();
        let Some(user) = self.users.get(&key) else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user.identity.clone()))
        } else {
            Ok(None)
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("Failed to hash password: {err}"))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|err| anyhow!("Stored password hash is invalid: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
