// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-guard middleware for Axum.
//!
//! Applied to the whole router, so it runs before every handler and before
//! the 404 fallback:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/secure", get(secure))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), secure_request));
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::guard::{Decision, GuardRejection};
use crate::state::AppState;

/// Guard every request with the KEM + signature pipeline.
pub async fn secure_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.as_bytes().to_vec())
        .unwrap_or_default();

    let guard = Arc::clone(&state.guard);
    let outcome = tokio::task::spawn_blocking(move || guard.inspect(&path, &authorization)).await;

    let response = match outcome {
        Ok(outcome) => match outcome.decision {
            Decision::Allow => next.run(request).await,
            Decision::Deny(rejection) => rejection.into_response(),
        },
        Err(e) => {
            tracing::error!(error = %e, "Request guard task failed");
            GuardRejection::ExchangeFailed.into_response()
        }
    };

    state
        .metrics
        .request_duration_seconds
        .observe(started.elapsed());

    response
}
