// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by a session token.
///
/// This is also the `payload` returned by the verify endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionClaims {
    /// Authenticated identity (the registered email).
    pub email: String,
    /// Issued at (Unix seconds, UTC)
    pub iat: i64,
    /// Expiration (Unix seconds, UTC)
    pub exp: i64,
}

impl SessionClaims {
    pub fn subject(&self) -> &str {
        &self.email
    }

    /// A token is dead once the clock is strictly past `exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}
