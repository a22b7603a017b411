// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Example protected endpoint.
//!
//! Nothing here checks credentials itself; reaching a handler at all means
//! the request guard allowed the call.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ApiError, MessageBody};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct EchoResponse {
    pub message: String,
    /// The JSON body that was posted.
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

/// Confirm the guard let the call through.
#[utoipa::path(
    get,
    path = "/secure",
    tag = "Secure",
    responses(
        (status = 200, description = "Guard passed", body = MessageBody),
        (status = 401, description = "Signature check failed", body = MessageBody),
        (status = 500, description = "Key exchange failed", body = MessageBody),
    )
)]
pub async fn check(State(state): State<AppState>) -> Json<MessageBody> {
    state.metrics.http_requests_total.inc();
    tracing::info!("Received GET request");

    Json(MessageBody {
        message: "Security server check passed".to_string(),
    })
}

/// Echo a JSON body back through the guarded path.
#[utoipa::path(
    post,
    path = "/secure",
    tag = "Secure",
    responses(
        (status = 200, description = "Data received", body = EchoResponse),
        (status = 400, description = "Body is not JSON", body = MessageBody),
    )
)]
pub async fn echo(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<EchoResponse>, ApiError> {
    state.metrics.http_requests_total.inc();

    let Json(data) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    tracing::info!(bytes = data.to_string().len(), "Received POST request");

    Ok(Json(EchoResponse {
        message: "Data received".to_string(),
        data,
    }))
}
