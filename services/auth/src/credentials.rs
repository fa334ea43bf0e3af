//! Credential store
//!
//! Wraps the user repository and the password hasher. Verification against an
//! unknown user runs the hasher on a decoy digest so the two failure cases
//! cost the same.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

use crate::crypto::{TOKEN_LENGTH, random_token};
use crate::error::StoreResult;
use crate::models::{User, UserId};
use crate::password::{PasswordError, PasswordHasher};
use crate::repositories::UserRepository;

#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    decoy_digest: String,
}

impl CredentialStore {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, PasswordError> {
        let decoy_digest = hasher.hash(&random_token(TOKEN_LENGTH))?;
        Ok(Self {
            users,
            hasher,
            decoy_digest,
        })
    }

    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    pub async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    pub async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    pub fn verify_password(&self, plain: &str, digest: &str) -> bool {
        self.hasher.verify(plain, digest)
    }

    /// Verify `plain` for `user`, or burn the same work on the decoy when
    /// there is no such user. Returns the user only on a match.
    pub fn verify_against<'a>(&self, user: Option<&'a User>, plain: &str) -> Option<&'a User> {
        match user {
            Some(user) if self.verify_password(plain, &user.password_digest) => Some(user),
            Some(_) => None,
            None => {
                let _ = self.verify_password(plain, &self.decoy_digest);
                None
            }
        }
    }

    /// Stamp `last_login`. A failed write is logged and ignored.
    pub async fn record_successful_login(&self, id: UserId, at: DateTime<Utc>) {
        if let Err(e) = self.users.record_login(id, at).await {
            warn!("Failed to update last login for user {}: {}", id, e);
        }
    }

    pub fn hash_password(&self, plain: &str) -> Result<String, PasswordError> {
        self.hasher.hash(plain)
    }
}
