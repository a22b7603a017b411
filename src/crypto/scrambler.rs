// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reversible token obfuscation for the audit trail.
//!
//! Output is URL-safe base64 of `[24-byte nonce || ciphertext || 16-byte tag]`
//! under XChaCha20-Poly1305. The key is generated when the scrambler is
//! constructed and lost on restart, so values written by an earlier process
//! cannot be recovered. That is acceptable: scrambled values are only ever
//! written to the audit log, never used for authorization.

use std::fmt;

use base64ct::{Base64Url, Encoding};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::XChaCha20Poly1305;

use super::ScrambleError;

#[cfg(test)]
const NONCE_LEN: usize = 24;

pub struct Scrambler {
    cipher: XChaCha20Poly1305,
}

impl Scrambler {
    /// Create a scrambler with a fresh random key.
    pub fn generate() -> Self {
        let key = XChaCha20Poly1305::generate_key(&mut OsRng);
        Self {
            cipher: XChaCha20Poly1305::new(&key),
        }
    }

    /// Encrypt `plaintext` for display in logs.
    ///
    /// The input must be UTF-8; header values that are not are rejected
    /// rather than lossily converted.
    pub fn scramble(&self, plaintext: &[u8]) -> Result<String, ScrambleError> {
        let text = std::str::from_utf8(plaintext)?;

        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, text.as_bytes())
            .map_err(|e| ScrambleError::Cipher(e.to_string()))?;

        let mut output = Vec::with_capacity(nonce.len() + ciphertext.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);
        Ok(Base64Url::encode_string(&output))
    }

    #[cfg(test)]
    pub(crate) fn reveal(&self, scrambled: &str) -> Result<String, ScrambleError> {
        use chacha20poly1305::XNonce;

        let data = Base64Url::decode_vec(scrambled)
            .map_err(|e| ScrambleError::Cipher(e.to_string()))?;
        if data.len() < NONCE_LEN {
            return Err(ScrambleError::Cipher("scrambled value too short".to_string()));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|e| ScrambleError::Cipher(e.to_string()))?;
        String::from_utf8(plaintext).map_err(|e| ScrambleError::Encoding(e.utf8_error()))
    }
}

impl fmt::Debug for Scrambler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scrambler").finish_non_exhaustive()
    }
}
