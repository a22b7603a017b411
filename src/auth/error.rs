// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token errors.

use thiserror::Error;

/// Why a token was refused.
///
/// The variants are kept apart for logging only. Callers always see the same
/// "Invalid token" message so the response cannot be used as an oracle.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The clock is past the token's `exp`.
    #[error("token has expired")]
    Expired,
    /// Signature, encoding or claim structure did not check out.
    #[error("token is malformed or tampered: {0}")]
    Malformed(String),
    /// Signing the claims failed at issuance.
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Stable code used in structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            TokenError::Expired => "token_expired",
            TokenError::Malformed(_) => "malformed_token",
            TokenError::Encoding(_) => "token_encoding_failed",
        }
    }
}
