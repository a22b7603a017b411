// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! Built once at startup and cloned into every handler. All keys and stores
//! are injected here; nothing in the crate reads them from globals.

use std::sync::Arc;

use crate::auth::{RequestGuard, TokenCodec};
use crate::crypto::{DilithiumSigner, KeyEncapsulation, KyberExchange, MessageSigner, Scrambler};
use crate::metrics::Metrics;
use crate::storage::{AuditSink, IdentityStore};

#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<RequestGuard>,
    pub tokens: Arc<TokenCodec>,
    pub scrambler: Arc<Scrambler>,
    pub identities: Arc<dyn IdentityStore>,
    pub audit: Arc<dyn AuditSink>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// State with the production Kyber-1024 exchange and Dilithium5 signer.
    pub fn new(
        token_secret: &[u8],
        identities: Arc<dyn IdentityStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::with_crypto(
            token_secret,
            identities,
            audit,
            Arc::new(KyberExchange::default()),
            Arc::new(DilithiumSigner),
        )
    }

    /// State with caller-supplied handshake and signer.
    pub fn with_crypto(
        token_secret: &[u8],
        identities: Arc<dyn IdentityStore>,
        audit: Arc<dyn AuditSink>,
        exchange: Arc<dyn KeyEncapsulation>,
        signer: Arc<dyn MessageSigner>,
    ) -> Self {
        let scrambler = Arc::new(Scrambler::generate());
        let metrics = Arc::new(Metrics::new());
        let guard = RequestGuard::new(
            exchange,
            signer,
            Arc::clone(&scrambler),
            Arc::clone(&audit),
            Arc::clone(&metrics),
        );

        Self {
            guard: Arc::new(guard),
            tokens: Arc::new(TokenCodec::new(token_secret)),
            scrambler,
            identities,
            audit,
            metrics,
        }
    }

    /// Scramble a token for the audit trail, logging instead of failing.
    pub fn scramble_for_audit(&self, token: &str) -> Option<String> {
        match self.scrambler.scramble(token.as_bytes()) {
            Ok(scrambled) => Some(scrambled),
            Err(e) => {
                tracing::warn!(error = %e, "Could not scramble token for audit");
                None
            }
        }
    }
}
