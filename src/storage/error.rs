// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage errors.

use std::io;

use thiserror::Error;

/// Error type for audit persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error type for the identity store.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity not found")]
    NotFound,
    #[error("identity already exists: {0}")]
    AlreadyExists(String),
    /// Unknown identifier or wrong secret. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("identity store lock poisoned")]
    LockPoisoned,
}
