// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the caller's bearer token.
//!
//! ```rust,ignore
//! async fn verify(token: BearerToken) -> impl IntoResponse {
//!     match token {
//!         BearerToken::Missing => { /* 400 */ }
//!         BearerToken::Unreadable => { /* 401 */ }
//!         BearerToken::Present(token) => { /* check it */ }
//!     }
//! }
//! ```

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

/// Token taken from the `Authorization` header.
///
/// Both the raw form (`Authorization: <token>`) and the RFC 6750 form
/// (`Authorization: Bearer <token>`) are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerToken {
    /// No header, or one that is blank once the prefix is removed.
    Missing,
    /// A header that is not visible ASCII and so cannot hold a token.
    Unreadable,
    Present(String),
}

impl BearerToken {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Self::Missing;
        };
        let Ok(raw) = value.to_str() else {
            return Self::Unreadable;
        };

        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
        if token.is_empty() {
            Self::Missing
        } else {
            Self::Present(token.to_string())
        }
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
