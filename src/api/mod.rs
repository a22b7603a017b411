// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::secure_request, SessionClaims},
    error::{ApiError, MessageBody},
    state::AppState,
};

pub mod health;
pub mod secure;
pub mod security;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/api/security/login", post(security::login))
        .route("/api/security/register", post(security::register))
        .route("/api/security/verify", get(security::verify))
        .route("/secure", get(secure::check).post(secure::echo))
        .route("/health/live", get(health::liveness))
        .route("/metrics", get(health::metrics))
        .with_state(state.clone());

    // The guard is the innermost layer so it sees every route and the
    // fallback, after tracing and request ids are in place.
    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state, secure_request))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

async fn not_found() -> ApiError {
    ApiError::new(axum::http::StatusCode::NOT_FOUND, "Not found")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        security::login,
        security::register,
        security::verify,
        secure::check,
        secure::echo,
        health::liveness,
        health::metrics
    ),
    components(
        schemas(
            security::CredentialsRequest,
            security::TokenResponse,
            security::VerifyResponse,
            secure::EchoResponse,
            health::HealthResponse,
            SessionClaims,
            MessageBody
        )
    ),
    tags(
        (name = "Security", description = "Login, registration and session tokens"),
        (name = "Secure", description = "Example endpoint behind the request guard"),
        (name = "Health", description = "Liveness and metrics")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, HeaderValue, Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::guard::tests::{BrokenSigner, FaultyExchange};
    use crate::crypto::{DilithiumSigner, KyberExchange};
    use crate::state::test_support::{test_state, test_state_with, TestState};
    use crate::storage::{AuditAction, AuditStatus, Secure};

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
        authorization: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn credentials(email: &str, password: &str) -> Option<Value> {
        Some(json!({ "email": email, "password": password }))
    }

    fn api_call_events(test: &TestState) -> Vec<crate::storage::AuditEvent> {
        test.audit
            .events()
            .into_iter()
            .filter(|e| e.action == AuditAction::ApiCall)
            .collect()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state().state);
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn register_login_verify_flow() {
        let test = test_state();
        let app = router(test.state.clone());

        let (status, body) = send(
            &app,
            "POST",
            "/api/security/register",
            credentials("u1@example.com", "longpass"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Registration successful");

        let (status, body) = send(
            &app,
            "POST",
            "/api/security/login",
            credentials("u1@example.com", "longpass"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", "/api/security/verify", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Token is valid");
        assert_eq!(body["payload"]["email"], "u1@example.com");

        let (status, body) = send(
            &app,
            "POST",
            "/api/security/login",
            credentials("u1@example.com", "wrongpass"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());

        let (status, body) = send(
            &app,
            "POST",
            "/api/security/register",
            credentials("u1@example.com", "longpass"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already exists");
        assert_eq!(test.identities.len().unwrap(), 1);

        assert_eq!(test.state.metrics.register_success_total.get(), 1);
        assert_eq!(test.state.metrics.register_failure_total.get(), 1);
        assert_eq!(test.state.metrics.login_success_total.get(), 1);
        assert_eq!(test.state.metrics.login_failure_total.get(), 1);
    }

    #[tokio::test]
    async fn bearer_prefixed_token_verifies() {
        let test = test_state();
        let app = router(test.state.clone());
        let token = test.state.tokens.issue("u2@example.com").unwrap();

        let (status, body) = send(
            &app,
            "GET",
            "/api/security/verify",
            None,
            Some(&format!("Bearer {token}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"]["email"], "u2@example.com");
    }

    #[tokio::test]
    async fn short_password_is_rejected_without_storing() {
        let test = test_state();
        let app = router(test.state.clone());

        let (status, body) = send(
            &app,
            "POST",
            "/api/security/register",
            credentials("u1@example.com", "ab"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Password too short");
        assert!(test.identities.is_empty().unwrap());

        let (status, _) = send(
            &app,
            "POST",
            "/api/security/login",
            credentials("u1@example.com", "ab"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let test = test_state();
        let app = router(test.state.clone());

        for uri in ["/api/security/login", "/api/security/register"] {
            let (status, body) =
                send(&app, "POST", uri, Some(json!({ "email": "u1@example.com" })), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Missing email or password");

            let (status, _) = send(&app, "POST", uri, None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert!(test.identities.is_empty().unwrap());
    }

    #[tokio::test]
    async fn unknown_identity_cannot_log_in() {
        let test = test_state();
        let app = router(test.state.clone());

        let (status, body) = send(
            &app,
            "POST",
            "/api/security/login",
            credentials("nobody@example.com", "longpass"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn verify_without_token_is_bad_request() {
        let test = test_state();
        let app = router(test.state.clone());

        let (status, body) = send(&app, "GET", "/api/security/verify", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Token required");
        assert_eq!(test.state.metrics.jwt_validation_failure_total.get(), 1);
    }

    #[tokio::test]
    async fn non_ascii_authorization_is_an_invalid_token() {
        let test = test_state();
        let app = router(test.state.clone());

        let request = Request::builder()
            .uri("/api/security/verify")
            .header(AUTHORIZATION, HeaderValue::from_bytes(b"tok\xe9n").unwrap())
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Invalid token");

        assert_eq!(test.state.metrics.jwt_validation_failure_total.get(), 1);
        let verify_events: Vec<_> = test
            .audit
            .events()
            .into_iter()
            .filter(|e| e.action == AuditAction::Verify)
            .collect();
        assert_eq!(verify_events.len(), 1);
        assert_eq!(verify_events[0].status, AuditStatus::Failed);
        assert!(verify_events[0].scrambled_token.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_registrations_yield_one_created_and_one_conflict() {
        let test = test_state();
        let app = router(test.state.clone());

        let (first, second) = tokio::join!(
            send(
                &app,
                "POST",
                "/api/security/register",
                credentials("race@example.com", "longpass"),
                None,
            ),
            send(
                &app,
                "POST",
                "/api/security/register",
                credentials("race@example.com", "otherpass"),
                None,
            ),
        );

        let mut statuses = [first.0, second.0];
        statuses.sort_by_key(|status| status.as_u16());
        assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

        assert_eq!(test.identities.len().unwrap(), 1);
        assert_eq!(test.state.metrics.register_success_total.get(), 1);
        assert_eq!(test.state.metrics.register_failure_total.get(), 1);
    }

    #[tokio::test]
    async fn expired_and_forged_tokens_look_the_same() {
        let test = test_state();
        let app = router(test.state.clone());

        let expired = test
            .state
            .tokens
            .issue_at("u1@example.com", Utc::now() - Duration::hours(2))
            .unwrap();
        let (expired_status, expired_body) =
            send(&app, "GET", "/api/security/verify", None, Some(&expired)).await;

        let (forged_status, forged_body) =
            send(&app, "GET", "/api/security/verify", None, Some("abc.def.ghi")).await;

        assert_eq!(expired_status, StatusCode::UNAUTHORIZED);
        assert_eq!(forged_status, StatusCode::UNAUTHORIZED);
        assert_eq!(expired_body, forged_body);
        assert_eq!(expired_body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn secure_endpoint_answers_get_and_echoes_post() {
        let test = test_state();
        let app = router(test.state.clone());

        let (status, body) = send(&app, "GET", "/secure", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Security server check passed");

        let (status, body) =
            send(&app, "POST", "/secure", Some(json!({ "reading": 42 })), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Data received");
        assert_eq!(body["data"]["reading"], 42);
    }

    #[tokio::test]
    async fn every_request_gets_one_guard_audit_event() {
        let test = test_state();
        let app = router(test.state.clone());

        send(&app, "GET", "/secure", None, Some("Bearer sometoken")).await;
        send(&app, "GET", "/health/live", None, None).await;
        let (status, _) = send(&app, "GET", "/no/such/route", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let events = api_call_events(&test);
        assert_eq!(events.len(), 3);
        for event in &events {
            assert_eq!(event.status, AuditStatus::Successful);
            assert_eq!(event.secure, Secure::Yes);
            assert!(event.scrambled_token.is_some());
        }

        let revealed = test
            .state
            .scrambler
            .reveal(events[0].scrambled_token.as_deref().unwrap())
            .unwrap();
        assert_eq!(revealed, "Bearer sometoken");
        assert_eq!(test.state.metrics.secure_request_total.get(), 3);
    }

    #[tokio::test]
    async fn failed_signature_check_blocks_handler() {
        let test = test_state_with(Arc::new(KyberExchange::default()), Arc::new(BrokenSigner));
        let app = router(test.state.clone());

        let (status, body) = send(
            &app,
            "POST",
            "/api/security/register",
            credentials("u1@example.com", "longpass"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid signature");
        assert!(test.identities.is_empty().unwrap());

        let events = test.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::ApiCall);
        assert_eq!(events[0].secure, Secure::No);
    }

    #[tokio::test]
    async fn exchange_fault_is_a_generic_500() {
        let test = test_state_with(Arc::new(FaultyExchange), Arc::new(DilithiumSigner));
        let app = router(test.state.clone());

        let (status, body) = send(&app, "GET", "/secure", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Secure channel could not be established");
        assert!(!body.to_string().contains("simulated library fault"));

        let events = test.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, AuditStatus::Failed);
        assert_eq!(test.state.metrics.http_requests_total.get(), 0);
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_counters() {
        let test = test_state();
        let app = router(test.state.clone());

        send(&app, "GET", "/secure", None, None).await;

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains("secure_request_total 2"));
        assert!(text.contains("http_requests_total 1"));
    }
}
