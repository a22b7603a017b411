// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Process-local collaborators of the gateway:
//!
//! - `audit` - non-blocking audit sink with a JSONL file writer
//! - `identity` - identity credential store (Argon2id hashes, in memory)
//!
//! Neither store survives a restart except the audit file, which is
//! append-only.

pub mod audit;
pub mod error;
pub mod identity;

pub use audit::{AuditAction, AuditEvent, AuditLog, AuditSink, AuditStatus, AuditWriter, Secure};
pub use error::{IdentityError, StorageError, StorageResult};
pub use identity::{IdentityRecord, IdentityStore, InMemoryIdentityStore};
