// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity credential store.
//!
//! Secrets are never stored. Each record holds an Argon2id PHC string with a
//! per-record random salt, and checks go through `argon2`'s constant-time
//! verifier.
//!
//! ## Concurrency
//!
//! Hashing runs before the lock is taken. Insertion is a single
//! check-and-insert under the write lock, so two concurrent registrations of
//! the same identifier produce exactly one winner and one
//! [`IdentityError::AlreadyExists`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use super::IdentityError;

/// Secrets of this many characters or fewer are refused at registration.
pub const MIN_SECRET_EXCLUSIVE: usize = 2;

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub identifier: String,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl IdentityRecord {
    /// Build a record by hashing `secret` under a fresh salt.
    pub fn hash_new(identifier: impl Into<String>, secret: &str) -> Result<Self, IdentityError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| IdentityError::Hashing(e.to_string()))?
            .to_string();

        Ok(Self {
            identifier: identifier.into(),
            password_hash,
        })
    }

    /// Constant-time check of `secret` against the stored hash.
    pub fn verify_secret(&self, secret: &str) -> bool {
        match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!(
                    identifier = %self.identifier,
                    error = %e,
                    "Stored password hash is unreadable"
                );
                false
            }
        }
    }
}

/// Repository of identity records, independent of backend.
pub trait IdentityStore: Send + Sync {
    fn lookup(&self, identifier: &str) -> Result<IdentityRecord, IdentityError>;

    /// Insert a new record. Fails with `AlreadyExists` if the identifier is taken.
    fn insert(&self, record: IdentityRecord) -> Result<(), IdentityError>;

    fn contains(&self, identifier: &str) -> Result<bool, IdentityError> {
        match self.lookup(identifier) {
            Ok(_) => Ok(true),
            Err(IdentityError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Check credentials against a store.
///
/// Unknown identifiers and wrong secrets both yield
/// [`IdentityError::InvalidCredentials`].
pub fn authenticate(
    store: &dyn IdentityStore,
    identifier: &str,
    secret: &str,
) -> Result<IdentityRecord, IdentityError> {
    let record = match store.lookup(identifier) {
        Ok(record) => record,
        Err(IdentityError::NotFound) => return Err(IdentityError::InvalidCredentials),
        Err(e) => return Err(e),
    };

    if record.verify_secret(secret) {
        Ok(record)
    } else {
        Err(IdentityError::InvalidCredentials)
    }
}

/// Whether a secret is too short to register with.
pub fn is_weak_secret(secret: &str) -> bool {
    secret.chars().count() <= MIN_SECRET_EXCLUSIVE
}

/// Process-local store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    records: RwLock<HashMap<String, IdentityRecord>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, IdentityError> {
        let records = self.records.read().map_err(|_| IdentityError::LockPoisoned)?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool, IdentityError> {
        Ok(self.len()? == 0)
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn lookup(&self, identifier: &str) -> Result<IdentityRecord, IdentityError> {
        let records = self.records.read().map_err(|_| IdentityError::LockPoisoned)?;
        records
            .get(identifier)
            .cloned()
            .ok_or(IdentityError::NotFound)
    }

    fn insert(&self, record: IdentityRecord) -> Result<(), IdentityError> {
        let mut records = self.records.write().map_err(|_| IdentityError::LockPoisoned)?;
        match records.entry(record.identifier.clone()) {
            Entry::Occupied(_) => Err(IdentityError::AlreadyExists(record.identifier)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }
}
