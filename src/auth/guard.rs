// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secure-request envelope.
//!
//! Each inbound call walks the same pipeline before its handler runs:
//!
//! ```text
//! Start ──KEM ok──▶ ExchangeDone ──sign+verify──▶ SignedAndVerified ──▶ Decided(Allow)
//!   │                                                   │
//!   └──KEM fault──▶ Decided(Deny 500)                   └──invalid──▶ Decided(Deny 401)
//! ```
//!
//! The request path is signed with a freshly generated keypair and checked
//! against the public key from that same call. With a correct signer this
//! always passes; a failure means the signer itself is broken. It is a
//! tamper-detection self-test, not a check of anything the client holds.
//!
//! Every decision records exactly one audit event carrying the scrambled
//! `Authorization` header, whatever the outcome.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::crypto::{KeyEncapsulation, KeyExchangeResult, MessageSigner, Scrambler};
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::storage::{AuditAction, AuditEvent, AuditSink};

/// Why the guard refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardRejection {
    /// The KEM handshake faulted. Details stay in the server log.
    #[error("Secure channel could not be established")]
    ExchangeFailed,
    #[error("Invalid signature")]
    InvalidSignature,
}

impl GuardRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GuardRejection::ExchangeFailed => StatusCode::INTERNAL_SERVER_ERROR,
            GuardRejection::InvalidSignature => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        ApiError::new(self.status_code(), self.to_string()).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(GuardRejection),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Result of one pass through the guard.
#[derive(Debug, Clone)]
pub struct GuardOutcome {
    pub decision: Decision,
    /// The event that was handed to the audit sink.
    pub audit: AuditEvent,
}

enum GuardState {
    Start,
    ExchangeDone(KeyExchangeResult),
    SignedAndVerified {
        secrets_match: bool,
        signature_valid: bool,
    },
    Decided {
        decision: Decision,
        details: String,
    },
}

/// Per-request allow/deny pipeline.
pub struct RequestGuard {
    exchange: Arc<dyn KeyEncapsulation>,
    signer: Arc<dyn MessageSigner>,
    scrambler: Arc<Scrambler>,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<Metrics>,
}

impl RequestGuard {
    pub fn new(
        exchange: Arc<dyn KeyEncapsulation>,
        signer: Arc<dyn MessageSigner>,
        scrambler: Arc<Scrambler>,
        audit: Arc<dyn AuditSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            exchange,
            signer,
            scrambler,
            audit,
            metrics,
        }
    }

    /// Run the pipeline for a request to `path`.
    ///
    /// `authorization` is the raw `Authorization` header value, empty if the
    /// caller sent none. CPU-bound; call from a blocking context.
    pub fn inspect(&self, path: &str, authorization: &[u8]) -> GuardOutcome {
        let started = Instant::now();
        self.metrics.secure_request_total.inc();

        let mut state = GuardState::Start;
        let (decision, details) = loop {
            state = match state {
                GuardState::Start => self.exchange(path),
                GuardState::ExchangeDone(exchange) => self.sign_and_verify(path, &exchange),
                GuardState::SignedAndVerified {
                    secrets_match,
                    signature_valid,
                } => GuardState::Decided {
                    decision: if signature_valid {
                        Decision::Allow
                    } else {
                        Decision::Deny(GuardRejection::InvalidSignature)
                    },
                    details: format!(
                        "Keys Match: {secrets_match}, Signature Valid: {signature_valid}"
                    ),
                },
                GuardState::Decided { decision, details } => break (decision, details),
            };
        };

        let scrambled_token = self.scramble_authorization(authorization);
        let event = match decision {
            Decision::Allow => {
                tracing::info!(path, "API call secured");
                AuditEvent::succeeded(AuditAction::ApiCall, format!("API call to {path} secured"))
            }
            Decision::Deny(GuardRejection::InvalidSignature) => {
                tracing::warn!(path, "Signature verification failed");
                AuditEvent::failed(
                    AuditAction::ApiCall,
                    format!("Signature verification failed for request to {path}"),
                )
            }
            Decision::Deny(GuardRejection::ExchangeFailed) => AuditEvent::failed(
                AuditAction::ApiCall,
                format!("Key exchange failed for request to {path}"),
            ),
        }
        .with_encryption_details(details)
        .with_scrambled_token(scrambled_token);

        self.audit.record(event.clone());
        self.metrics
            .request_processing_seconds
            .observe(started.elapsed());

        GuardOutcome {
            decision,
            audit: event,
        }
    }

    fn exchange(&self, path: &str) -> GuardState {
        match self.exchange.perform_exchange() {
            Ok(result) => GuardState::ExchangeDone(result),
            Err(e) => {
                tracing::error!(path, error = %e, "Key exchange failed");
                // Channel faults count as validation failures.
                self.metrics.jwt_validation_failure_total.inc();
                GuardState::Decided {
                    decision: Decision::Deny(GuardRejection::ExchangeFailed),
                    details: format!("Key exchange failed: {e}"),
                }
            }
        }
    }

    fn sign_and_verify(&self, path: &str, exchange: &KeyExchangeResult) -> GuardState {
        let message = path.as_bytes();
        let signed = self.signer.sign(message);
        let signature_valid = self
            .signer
            .verify(message, &signed.signature, &signed.public_key);

        GuardState::SignedAndVerified {
            secrets_match: exchange.secrets_match,
            signature_valid,
        }
    }

    fn scramble_authorization(&self, authorization: &[u8]) -> Option<String> {
        match self.scrambler.scramble(authorization) {
            Ok(scrambled) => Some(scrambled),
            Err(e) => {
                tracing::warn!(error = %e, "Could not scramble authorization header for audit");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::{DilithiumSigner, ExchangeError, KyberExchange, SignedMessage};
    use crate::storage::audit::MemoryAuditSink;
    use crate::storage::{AuditStatus, Secure};

    pub(crate) struct FaultyExchange;

    impl KeyEncapsulation for FaultyExchange {
        fn perform_exchange(&self) -> Result<KeyExchangeResult, ExchangeError> {
            Err(ExchangeError::Library("simulated library fault".to_string()))
        }
    }

    /// Produces signatures that never verify.
    pub(crate) struct BrokenSigner;

    impl MessageSigner for BrokenSigner {
        fn sign(&self, _message: &[u8]) -> SignedMessage {
            SignedMessage {
                public_key: vec![0; 8],
                signature: vec![0; 8],
            }
        }

        fn verify(&self, _message: &[u8], _signature: &[u8], _public_key: &[u8]) -> bool {
            false
        }
    }

    fn guard_with(
        exchange: Arc<dyn KeyEncapsulation>,
        signer: Arc<dyn MessageSigner>,
    ) -> (RequestGuard, Arc<MemoryAuditSink>, Arc<Scrambler>, Arc<Metrics>) {
        let audit = Arc::new(MemoryAuditSink::default());
        let scrambler = Arc::new(Scrambler::generate());
        let metrics = Arc::new(Metrics::new());
        let guard = RequestGuard::new(
            exchange,
            signer,
            Arc::clone(&scrambler),
            audit.clone(),
            Arc::clone(&metrics),
        );
        (guard, audit, scrambler, metrics)
    }

    #[test]
    fn healthy_pipeline_allows_and_audits_once() {
        let (guard, audit, scrambler, metrics) =
            guard_with(Arc::new(KyberExchange::default()), Arc::new(DilithiumSigner));

        let outcome = guard.inspect("/secure", b"Bearer abc");
        assert_eq!(outcome.decision, Decision::Allow);

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::ApiCall);
        assert_eq!(events[0].status, AuditStatus::Successful);
        assert_eq!(events[0].secure, Secure::Yes);
        assert_eq!(
            events[0].encryption_details.as_deref(),
            Some("Keys Match: true, Signature Valid: true")
        );

        let scrambled = events[0].scrambled_token.as_deref().unwrap();
        assert_eq!(scrambler.reveal(scrambled).unwrap(), "Bearer abc");

        assert_eq!(metrics.secure_request_total.get(), 1);
        assert_eq!(metrics.request_processing_seconds.count(), 1);
    }

    #[test]
    fn exchange_fault_denies_with_500() {
        let (guard, audit, _, metrics) =
            guard_with(Arc::new(FaultyExchange), Arc::new(DilithiumSigner));

        let outcome = guard.inspect("/secure", b"");
        assert_eq!(outcome.decision, Decision::Deny(GuardRejection::ExchangeFailed));
        assert_eq!(
            GuardRejection::ExchangeFailed.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, AuditStatus::Failed);
        assert_eq!(events[0].secure, Secure::No);
        assert_eq!(metrics.jwt_validation_failure_total.get(), 1);
    }

    #[test]
    fn invalid_signature_denies_with_401() {
        let (guard, audit, _, _) =
            guard_with(Arc::new(KyberExchange::default()), Arc::new(BrokenSigner));

        let outcome = guard.inspect("/api/security/login", b"");
        assert_eq!(outcome.decision, Decision::Deny(GuardRejection::InvalidSignature));
        assert_eq!(
            GuardRejection::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].secure, Secure::No);
        assert_eq!(
            events[0].encryption_details.as_deref(),
            Some("Keys Match: true, Signature Valid: false")
        );
    }

    #[test]
    fn empty_authorization_is_still_scrambled() {
        let (guard, audit, scrambler, _) = guard_with(Arc::new(FaultyExchange), Arc::new(BrokenSigner));

        guard.inspect("/secure", b"");
        let scrambled = audit.events()[0].scrambled_token.clone().unwrap();
        assert_eq!(scrambler.reveal(&scrambled).unwrap(), "");
    }

    #[test]
    fn unscramblable_header_does_not_change_decision() {
        let (guard, audit, _, _) =
            guard_with(Arc::new(KyberExchange::default()), Arc::new(DilithiumSigner));

        let outcome = guard.inspect("/secure", &[0xFF, 0xFE]);
        assert!(outcome.decision.is_allowed());
        assert!(audit.events()[0].scrambled_token.is_none());
    }
}
