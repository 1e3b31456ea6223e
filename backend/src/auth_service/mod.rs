// SPDX-FileCopyrightText: 2023 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Registered users and their password hashes, kept as one list in the blob
//! store.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use ledgercommon::{
    identifiers::{Identifier, UserId},
    messages::{LoginRequest, SignupRequest},
    records::User,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    blob_store::{BlobStore, load_list, store_list},
    errors::AuthError,
    key_lock::KeyLocks,
};

pub mod cli;

const USERS_STORE: &str = "users_auth_store";
const USERS_KEY: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(flatten)]
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    blobs: Arc<dyn BlobStore>,
    locks: KeyLocks,
}

impl AuthService {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            locks: KeyLocks::default(),
        }
    }

    async fn load_users(&self) -> Result<Vec<StoredUser>, AuthError> {
        let users = load_list(self.blobs.as_ref(), USERS_STORE, USERS_KEY).await?;
        Ok(users.unwrap_or_default())
    }

    /// Registers a new user and returns its public profile.
    pub async fn signup(&self, request: SignupRequest) -> Result<User, AuthError> {
        request.validate()?;

        let _guard = self.locks.lock(USERS_KEY).await;
        let mut users = self.load_users().await?;
        if users.iter().any(|u| u.user.username == request.username) {
            return Err(AuthError::UsernameTaken);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(request.password.as_bytes(), &salt)?
            .to_string();

        let user = User {
            id: UserId::random(),
            first_name: request.first_name,
            last_name: request.last_name,
            username: request.username,
            mobile: request.mobile,
        };
        users.push(StoredUser {
            user: user.clone(),
            password_hash,
        });
        store_list(self.blobs.as_ref(), USERS_STORE, USERS_KEY, &users).await?;

        info!(username = %user.username, "New user signed up");
        Ok(user)
    }

    /// Checks the credentials and returns the matching user.
    pub async fn login(&self, request: &LoginRequest) -> Result<User, AuthError> {
        request.validate()?;

        let users = self.load_users().await?;
        let stored = users
            .into_iter()
            .find(|u| u.user.username == request.username)
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed_hash = PasswordHash::new(&stored.password_hash)?;
        match Argon2::default().verify_password(request.password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(stored.user),
            Err(argon2::password_hash::Error::Password) => Err(AuthError::InvalidCredentials),
            Err(error) => Err(error.into()),
        }
    }

    /// Looks up a user by username.
    pub async fn find_user(&self, username: &str) -> Result<Option<User>, AuthError> {
        let users = self.load_users().await?;
        Ok(users
            .into_iter()
            .map(|u| u.user)
            .find(|u| u.username == username))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        let users = self.load_users().await?;
        Ok(users.into_iter().map(|u| u.user).collect())
    }
}
