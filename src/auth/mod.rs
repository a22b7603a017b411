// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens and the request guard.
//!
//! ## Session Flow
//!
//! 1. Client registers or logs in with `{email, password}`
//! 2. Server issues an HS256 session token valid for one hour
//! 3. Client presents the token in `Authorization` (raw or `Bearer <token>`)
//! 4. `GET /api/security/verify` returns the decoded claims
//!
//! ## Request Guard
//!
//! Every route, including unmatched ones, runs through
//! [`middleware::secure_request`] before its handler. See [`guard`] for the
//! decision pipeline.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod middleware;
pub mod token;

pub use claims::SessionClaims;
pub use error::TokenError;
pub use extractor::BearerToken;
pub use guard::{Decision, GuardOutcome, GuardRejection, RequestGuard};
pub use token::TokenCodec;
