//! HTTP surface, driven through the router without a socket

mod common;

use axum::Router;
use axum::body::Body;
use brew_server::api::create_router;
use brew_server::auth::create_token;
use common::*;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::ErrorCode;
use shared::models::Role;
use tower::ServiceExt;

fn bearer(customer: &str, role: Role) -> String {
    format!("Bearer {}", create_token(customer, role, JWT_SECRET).unwrap())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, auth: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, auth: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap()
}

fn put_json(uri: &str, auth: &str, body: Value) -> Request<Body> {
    Request::put(uri)
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn webhook(payload: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::post("/stripe/webhook").header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(payload)).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let router = create_router(app.state.clone());
    let (status, body) = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "brew-server");
}

#[tokio::test]
async fn test_customer_routes_need_a_token() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let (status, _) = send(&router, Request::get("/api/cart").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&router, get("/api/cart", "Bearer not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_checkout_and_webhook_over_http() {
    let app = test_app();
    let router = create_router(app.state.clone());
    let amy = bearer("amy@example.com", Role::Member);

    let (status, body) = send(
        &router,
        put_json(
            "/api/cart/items",
            &amy,
            json!({
                "product_id": 7,
                "size": "Large",
                "ice_level": "Less Ice",
                "sugar_level": "50%",
                "quantity": 2
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["total"], "17.00");

    let (status, body) = send(&router, post("/api/checkout", &amy)).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["data"]["order_id"].as_i64().unwrap();
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();

    let payload = completed_event("evt_http", &session_id, order_id);
    let signature = sign(&payload);
    let (status, body) = send(&router, webhook(payload, Some(signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "processed");
    assert_eq!(body["applied"], true);

    let (status, body) = send(&router, get(&format!("/api/orders/{order_id}"), &amy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PAID");
    assert_eq!(body["data"]["total"], "17.00");

    let (_, body) = send(&router, get("/api/cart", &amy)).await;
    assert!(body["data"]["entries"].as_array().unwrap().is_empty());
    assert_eq!(app.receipts_sent().await, 1);
}

#[tokio::test]
async fn test_rejected_webhook_is_a_bare_400() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let payload = completed_event("evt_forged", "cs_any", 1);
    let forged = sign_with(&payload, "whsec_attacker");
    let (status, body) = send(&router, webhook(payload.clone(), Some(forged))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&router, webhook(payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Value::Null);

    let garbage = b"not json".to_vec();
    let signature = sign(&garbage);
    let (status, _) = send(&router, webhook(garbage, Some(signature))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unmatched_session_is_acknowledged() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let payload = completed_event("evt_lost", "cs_unknown", 99);
    let signature = sign(&payload);
    let (status, body) = send(&router, webhook(payload, Some(signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "unmatched");
}

#[tokio::test]
async fn test_empty_cart_checkout_is_rejected() {
    let app = test_app();
    let router = create_router(app.state.clone());
    let amy = bearer("amy@example.com", Role::Member);

    let (status, body) = send(&router, post("/api/checkout", &amy)).await;
    assert_ne!(status, StatusCode::OK);
    assert_eq!(body["code"], ErrorCode::CartEmpty.code());
}

#[tokio::test]
async fn test_unknown_size_is_rejected() {
    let app = test_app();
    let router = create_router(app.state.clone());
    let amy = bearer("amy@example.com", Role::Member);

    let (status, body) = send(
        &router,
        put_json(
            "/api/cart/items",
            &amy,
            json!({ "product_id": 7, "size": "Venti", "quantity": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], ErrorCode::InvalidSize.code());
}

#[tokio::test]
async fn test_orders_are_private_and_admin_routes_gated() {
    let app = test_app();
    let router = create_router(app.state.clone());
    let amy = bearer("amy@example.com", Role::Member);
    let mallory = bearer("mallory@example.com", Role::Member);
    let admin = bearer("ops@example.com", Role::Admin);

    send(
        &router,
        put_json(
            "/api/cart/items",
            &amy,
            json!({ "product_id": 8, "size": "Regular", "quantity": 1 }),
        ),
    )
    .await;
    let (_, body) = send(&router, post("/api/checkout", &amy)).await;
    let order_id = body["data"]["order_id"].as_i64().unwrap();

    // Someone else's order looks missing
    let (status, _) = send(&router, get(&format!("/api/orders/{order_id}"), &mallory)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&router, post(&format!("/api/orders/{order_id}/cancel"), &mallory)).await;
    assert_ne!(status, StatusCode::OK);

    let (status, _) = send(&router, get("/api/admin/orders", &amy)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&router, get(&format!("/api/orders/{order_id}"), &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customer"], "amy@example.com");

    let (status, body) = send(&router, get("/api/admin/orders?status=PENDING&page_size=500", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["page_size"], 100);

    // Still pending, so it cannot be completed
    let (status, _) = send(&router, post(&format!("/api/admin/orders/{order_id}/complete"), &admin)).await;
    assert_ne!(status, StatusCode::OK);

    send(&router, get("/checkout/success", &amy)).await;
    let (status, body) = send(&router, post(&format!("/api/admin/orders/{order_id}/complete"), &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "COMPLETED");
}

#[tokio::test]
async fn test_cancel_redirect_goes_back_to_the_cart() {
    let app = test_app();
    let router = create_router(app.state.clone());

    let response = router
        .oneshot(Request::get("/checkout/cancel").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://brew.example/cart"
    );
}
