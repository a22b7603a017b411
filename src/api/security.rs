// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, registration and token verification endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{BearerToken, SessionClaims};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::identity::{self, is_weak_secret};
use crate::storage::{AuditAction, AuditEvent, IdentityError, IdentityRecord};

/// Body of login and registration requests.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Both fields, if present and non-empty.
    fn into_parts(self) -> Option<(String, String)> {
        match (self.email, self.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub message: String,
    /// Session token, valid for one hour.
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub message: String,
    pub payload: SessionClaims,
}

fn credentials(body: Result<Json<CredentialsRequest>, JsonRejection>) -> Option<(String, String)> {
    body.ok().and_then(|Json(request)| request.into_parts())
}

/// Run CPU-heavy identity work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "Blocking identity task failed");
        ApiError::internal()
    })
}

fn issue_token(state: &AppState, email: &str) -> Result<String, ApiError> {
    state.tokens.issue(email).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue session token");
        ApiError::internal()
    })
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/api/security/login",
    tag = "Security",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Missing email or password", body = crate::error::MessageBody),
        (status = 401, description = "Invalid credentials", body = crate::error::MessageBody),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    state.metrics.http_requests_total.inc();

    let Some((email, password)) = credentials(body) else {
        state.metrics.login_failure_total.inc();
        state.audit.record(AuditEvent::failed(
            AuditAction::Login,
            "Login failed: Missing email or password",
        ));
        return Err(ApiError::bad_request("Missing email or password"));
    };

    let identities = Arc::clone(&state.identities);
    let candidate = email.clone();
    let checked =
        blocking(move || identity::authenticate(identities.as_ref(), &candidate, &password))
            .await?;

    match checked {
        Ok(_) => {}
        Err(IdentityError::InvalidCredentials) => {
            state.metrics.login_failure_total.inc();
            tracing::warn!(email = %email, "Login failed: invalid credentials");
            state.audit.record(AuditEvent::failed(
                AuditAction::Login,
                format!("Login failed: Invalid credentials for {email}"),
            ));
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
        Err(e) => {
            state.metrics.login_failure_total.inc();
            tracing::error!(error = %e, "Identity lookup failed during login");
            state.audit.record(AuditEvent::failed(
                AuditAction::Login,
                format!("Login failed: identity store error for {email}"),
            ));
            return Err(ApiError::internal());
        }
    }

    let token = issue_token(&state, &email)?;
    state.metrics.login_success_total.inc();
    tracing::info!(email = %email, "User logged in");
    state.audit.record(
        AuditEvent::succeeded(AuditAction::Login, format!("User {email} logged in successfully"))
            .with_scrambled_token(state.scramble_for_audit(&token)),
    );

    Ok(Json(TokenResponse {
        message: "Login successful".to_string(),
        token,
    }))
}

/// Register a new identity and log it in.
#[utoipa::path(
    post,
    path = "/api/security/register",
    tag = "Security",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Registration successful", body = TokenResponse),
        (status = 400, description = "Missing email or password", body = crate::error::MessageBody),
        (status = 401, description = "Password too short", body = crate::error::MessageBody),
        (status = 409, description = "Email already exists", body = crate::error::MessageBody),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    state.metrics.http_requests_total.inc();

    let reject = |message: String, error: ApiError| {
        state.metrics.register_failure_total.inc();
        tracing::warn!(reason = %message, "Registration failed");
        state
            .audit
            .record(AuditEvent::failed(AuditAction::Register, message));
        error
    };

    let Some((email, password)) = credentials(body) else {
        return Err(reject(
            "Registration failed: Missing email or password".to_string(),
            ApiError::bad_request("Missing email or password"),
        ));
    };

    let already_exists = || {
        reject(
            format!("Registration failed: Email {email} already exists"),
            ApiError::conflict("Email already exists"),
        )
    };

    match state.identities.contains(&email) {
        Ok(false) => {}
        Ok(true) => return Err(already_exists()),
        Err(e) => {
            tracing::error!(error = %e, "Identity lookup failed during registration");
            return Err(reject(
                format!("Registration failed: identity store error for {email}"),
                ApiError::internal(),
            ));
        }
    }

    if is_weak_secret(&password) {
        return Err(reject(
            "Registration failed: Password too short".to_string(),
            ApiError::unauthorized("Password too short"),
        ));
    }

    let identities = Arc::clone(&state.identities);
    let identifier = email.clone();
    let inserted = blocking(move || {
        let record = IdentityRecord::hash_new(identifier, &password)?;
        identities.insert(record)
    })
    .await?;

    match inserted {
        Ok(()) => {}
        Err(IdentityError::AlreadyExists(_)) => return Err(already_exists()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to store new identity");
            return Err(reject(
                format!("Registration failed: identity store error for {email}"),
                ApiError::internal(),
            ));
        }
    }

    let token = issue_token(&state, &email)?;
    state.metrics.register_success_total.inc();
    tracing::info!(email = %email, "User registered");
    state.audit.record(
        AuditEvent::succeeded(
            AuditAction::Register,
            format!("User {email} registered successfully"),
        )
        .with_scrambled_token(state.scramble_for_audit(&token)),
    );

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            message: "Registration successful".to_string(),
            token,
        }),
    ))
}

/// Verify the session token in the `Authorization` header.
#[utoipa::path(
    get,
    path = "/api/security/verify",
    tag = "Security",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 400, description = "Token required", body = crate::error::MessageBody),
        (status = 401, description = "Invalid token", body = crate::error::MessageBody),
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<VerifyResponse>, ApiError> {
    state.metrics.http_requests_total.inc();

    let token = match token {
        BearerToken::Present(token) => token,
        BearerToken::Missing => {
            state.metrics.jwt_validation_failure_total.inc();
            state.audit.record(AuditEvent::failed(
                AuditAction::Verify,
                "Token validation failed: No token provided",
            ));
            return Err(ApiError::bad_request("Token required"));
        }
        BearerToken::Unreadable => {
            tracing::info!("Token validation failed: authorization header is not ASCII");
            return Err(invalid_token(&state, None));
        }
    };

    let scrambled = state.scramble_for_audit(&token);

    match state.tokens.verify(&token) {
        Ok(claims) => {
            state.audit.record(
                AuditEvent::succeeded(AuditAction::Verify, "Token validation successful")
                    .with_scrambled_token(scrambled),
            );
            Ok(Json(VerifyResponse {
                message: "Token is valid".to_string(),
                payload: claims,
            }))
        }
        Err(e) => {
            tracing::info!(error_code = e.error_code(), error = %e, "Token validation failed");
            Err(invalid_token(&state, scrambled))
        }
    }
}

/// Expired, forged and unreadable tokens all get the same answer.
fn invalid_token(state: &AppState, scrambled: Option<String>) -> ApiError {
    state.metrics.jwt_validation_failure_total.inc();
    state.audit.record(
        AuditEvent::failed(AuditAction::Verify, "Token validation failed: Invalid token")
            .with_scrambled_token(scrambled),
    );
    ApiError::unauthorized("Invalid token")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_count_as_missing() {
        let request = CredentialsRequest {
            email: Some(String::new()),
            password: Some("longpass".to_string()),
        };
        assert!(request.into_parts().is_none());

        let request = CredentialsRequest {
            email: Some("u1@example.com".to_string()),
            password: None,
        };
        assert!(request.into_parts().is_none());
    }

    #[test]
    fn complete_request_yields_parts() {
        let request = CredentialsRequest {
            email: Some("u1@example.com".to_string()),
            password: Some("longpass".to_string()),
        };
        assert_eq!(
            request.into_parts(),
            Some(("u1@example.com".to_string(), "longpass".to_string()))
        );
    }
}
