// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cryptographic Primitives
//!
//! Building blocks for the secure-request envelope:
//!
//! - `kem` - Kyber key-encapsulation handshake between two ephemeral parties
//! - `signature` - Dilithium sign/verify with a fresh keypair per signature
//! - `scrambler` - XChaCha20-Poly1305 obfuscation of bearer tokens for audit
//!
//! ## Key Lifecycle
//!
//! KEM and signing keys are generated per operation and dropped immediately.
//! The scrambler key lives for the lifetime of the process and is never
//! written anywhere.

pub mod error;
pub mod kem;
pub mod scrambler;
pub mod signature;

pub use error::{ExchangeError, ScrambleError};
pub use kem::{KemParameterSet, KeyEncapsulation, KeyExchangeResult, KyberExchange};
pub use scrambler::Scrambler;
pub use signature::{DilithiumSigner, MessageSigner, SignedMessage};
