// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dilithium message signatures.
//!
//! ## Known Limitation
//!
//! `sign` generates a new keypair on every call, so a [`SignedMessage`] can
//! only be checked against the public key returned alongside it. There is no
//! enrolled client identity yet; callers that need one should supply their
//! own [`MessageSigner`].

use pqcrypto_dilithium::dilithium5;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _};

/// Detached signature plus the public key that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl SignedMessage {
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    pub fn signature_hex(&self) -> String {
        hex::encode(&self.signature)
    }
}

/// Sign/verify capability used by the request guard.
pub trait MessageSigner: Send + Sync {
    /// Sign `message` under a freshly generated keypair.
    fn sign(&self, message: &[u8]) -> SignedMessage;

    /// True iff `signature` validates against exactly `message` and `public_key`.
    ///
    /// Malformed key or signature bytes return false.
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;

    /// [`MessageSigner::verify`] over hex-encoded signature and key.
    fn verify_hex(&self, message: &[u8], signature_hex: &str, public_key_hex: &str) -> bool {
        match (hex::decode(signature_hex), hex::decode(public_key_hex)) {
            (Ok(signature), Ok(public_key)) => self.verify(message, &signature, &public_key),
            _ => false,
        }
    }
}

/// Dilithium5 signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DilithiumSigner;

impl MessageSigner for DilithiumSigner {
    fn sign(&self, message: &[u8]) -> SignedMessage {
        let (public_key, secret_key) = dilithium5::keypair();
        let signature = dilithium5::detached_sign(message, &secret_key);

        SignedMessage {
            public_key: public_key.as_bytes().to_vec(),
            signature: signature.as_bytes().to_vec(),
        }
    }

    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(public_key) = dilithium5::PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = dilithium5::DetachedSignature::from_bytes(signature) else {
            return false;
        };

        dilithium5::verify_detached_signature(&signature, message, &public_key).is_ok()
    }
}
