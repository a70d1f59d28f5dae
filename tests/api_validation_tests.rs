// SPDX-License-Identifier: MIT

//! Request validation tests (offline).
//!
//! Validation happens before any database access, so these run against
//! the offline mock.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed_post(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn unlock_requires_prompt_id() {
    let (app, _) = common::create_test_app();
    let token = common::mint_id_token("user-1", Some("u@example.com"), None);

    let response = app
        .oneshot(authed_post("/api/prompts/unlock", &token, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "promptId é obrigatório");
}

#[tokio::test]
async fn unlock_rejects_blank_prompt_id() {
    let (app, _) = common::create_test_app();
    let token = common::mint_id_token("user-1", Some("u@example.com"), None);

    let response = app
        .oneshot(authed_post(
            "/api/prompts/unlock",
            &token,
            json!({"promptId": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn track_access_requires_prompt_id() {
    let (app, _) = common::create_test_app();
    let token = common::mint_id_token("user-1", Some("u@example.com"), None);

    let response = app
        .oneshot(authed_post("/api/prompts/track-access", &token, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_rejects_unknown_plan() {
    let (app, _) = common::create_test_app();
    let token = common::mint_id_token("user-1", Some("u@example.com"), None);

    let response = app
        .oneshot(authed_post(
            "/api/stripe/checkout",
            &token,
            json!({"planoId": "GOLD_ANUAL"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Plano inválido: GOLD_ANUAL");
}

#[tokio::test]
async fn checkout_requires_plan_id() {
    let (app, _) = common::create_test_app();
    let token = common::mint_id_token("user-1", Some("u@example.com"), None);

    let response = app
        .oneshot(authed_post("/api/stripe/checkout", &token, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "planoId é obrigatório");
}

#[tokio::test]
async fn lead_capture_requires_valid_email() {
    let (app, _) = common::create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/leads")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"email": "not-an-email"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Email inválido");
}

#[tokio::test]
async fn lead_capture_requires_email() {
    let (app, _) = common::create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/leads")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"name": "Maria"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Email é obrigatório");
}

#[tokio::test]
async fn database_failures_do_not_leak_details() {
    let (app, _) = common::create_test_app();

    // Offline mock: the prompt lookup fails internally
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/prompts/prompt-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Erro interno do servidor");
}
