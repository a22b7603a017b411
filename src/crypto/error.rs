// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cryptographic errors.

use thiserror::Error;

/// Failure of the KEM handshake.
///
/// Both variants are internal faults: a correct KEM always agrees on the
/// secret, so neither is ever interpreted as an attacker signal.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The underlying library rejected key or ciphertext material.
    #[error("KEM library fault: {0}")]
    Library(String),
    /// Decapsulation produced a different secret than encapsulation.
    #[error("shared secrets diverged after decapsulation")]
    SecretMismatch,
}

/// Failure to scramble a value for the audit trail.
#[derive(Debug, Error)]
pub enum ScrambleError {
    /// Input was not valid UTF-8.
    #[error("value is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    /// The AEAD refused to encrypt or decrypt.
    #[error("cipher failure: {0}")]
    Cipher(String),
}
