// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Quantum Gate - Post-Quantum Secured Session Gateway
//!
//! Issues and verifies session tokens, and wraps every inbound API call in a
//! simulated post-quantum handshake (Kyber key exchange plus a Dilithium
//! signature self-check) before it reaches a handler.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session tokens and the request guard
//! - `crypto` - KEM, signatures and token scrambling
//! - `storage` - Identity store and audit sink
//! - `metrics` - Prometheus-format counters

pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod metrics;
pub mod state;
pub mod storage;
