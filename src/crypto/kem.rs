// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Kyber key-encapsulation handshake.
//!
//! One call simulates both ends of a key agreement:
//!
//! 1. The initiator generates a keypair.
//! 2. An independent responder parses the initiator's public key from its
//!    wire bytes and encapsulates a fresh secret against it.
//! 3. The initiator parses the ciphertext from its wire bytes and
//!    decapsulates.
//!
//! The two secrets must be equal. Any divergence is reported as
//! [`ExchangeError::SecretMismatch`].

use std::fmt;

use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SharedSecret as _};

use super::ExchangeError;

/// Supported Kyber security levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KemParameterSet {
    Kyber512,
    Kyber768,
    #[default]
    Kyber1024,
}

impl KemParameterSet {
    /// Every parameter set this build can run.
    pub const ALL: [KemParameterSet; 3] = [
        KemParameterSet::Kyber512,
        KemParameterSet::Kyber768,
        KemParameterSet::Kyber1024,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KemParameterSet::Kyber512 => "Kyber512",
            KemParameterSet::Kyber768 => "Kyber768",
            KemParameterSet::Kyber1024 => "Kyber1024",
        }
    }
}

/// Material produced by one handshake. Never persisted.
#[derive(Clone)]
pub struct KeyExchangeResult {
    pub initiator_public_key: Vec<u8>,
    pub encapsulated_secret: Vec<u8>,
    pub responder_secret: Vec<u8>,
    pub initiator_secret: Vec<u8>,
    pub secrets_match: bool,
}

impl KeyExchangeResult {
    fn new(
        initiator_public_key: Vec<u8>,
        encapsulated_secret: Vec<u8>,
        responder_secret: Vec<u8>,
        initiator_secret: Vec<u8>,
    ) -> Self {
        let secrets_match = responder_secret == initiator_secret;
        Self {
            initiator_public_key,
            encapsulated_secret,
            responder_secret,
            initiator_secret,
            secrets_match,
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for KeyExchangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExchangeResult")
            .field("initiator_public_key_len", &self.initiator_public_key.len())
            .field("encapsulated_secret_len", &self.encapsulated_secret.len())
            .field("secrets_match", &self.secrets_match)
            .finish_non_exhaustive()
    }
}

/// A one-shot key agreement between two ephemeral parties.
pub trait KeyEncapsulation: Send + Sync {
    /// Run the handshake and return the agreed material.
    fn perform_exchange(&self) -> Result<KeyExchangeResult, ExchangeError>;
}

/// Kyber handshake at a fixed parameter set.
#[derive(Debug, Clone, Copy, Default)]
pub struct KyberExchange {
    parameter_set: KemParameterSet,
}

impl KyberExchange {
    pub fn new(parameter_set: KemParameterSet) -> Self {
        Self { parameter_set }
    }

    pub fn parameter_set(&self) -> KemParameterSet {
        self.parameter_set
    }
}

macro_rules! kyber_handshake {
    ($level:ident) => {{
        use pqcrypto_kyber::$level as kem;

        let (public_key, secret_key) = kem::keypair();

        let received_key = kem::PublicKey::from_bytes(public_key.as_bytes())
            .map_err(|e| ExchangeError::Library(format!("public key rejected: {e:?}")))?;
        let (responder_secret, ciphertext) = kem::encapsulate(&received_key);

        let received_ciphertext = kem::Ciphertext::from_bytes(ciphertext.as_bytes())
            .map_err(|e| ExchangeError::Library(format!("ciphertext rejected: {e:?}")))?;
        let initiator_secret = kem::decapsulate(&received_ciphertext, &secret_key);

        KeyExchangeResult::new(
            public_key.as_bytes().to_vec(),
            ciphertext.as_bytes().to_vec(),
            responder_secret.as_bytes().to_vec(),
            initiator_secret.as_bytes().to_vec(),
        )
    }};
}

impl KeyEncapsulation for KyberExchange {
    fn perform_exchange(&self) -> Result<KeyExchangeResult, ExchangeError> {
        let result = match self.parameter_set {
            KemParameterSet::Kyber512 => kyber_handshake!(kyber512),
            KemParameterSet::Kyber768 => kyber_handshake!(kyber768),
            KemParameterSet::Kyber1024 => kyber_handshake!(kyber1024),
        };

        if !result.secrets_match {
            tracing::error!(
                parameter_set = self.parameter_set.as_str(),
                "KEM decapsulation disagreed with encapsulation"
            );
            return Err(ExchangeError::SecretMismatch);
        }

        Ok(result)
    }
}
