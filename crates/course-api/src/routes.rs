//! # Routes
//!
//! Axum router configuration for the marketplace API.

use crate::state::AppState;
use crate::{affiliate, auth, handlers};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/courses - List active courses
///   - GET  /api/courses/{course_id} - Get course by ID
///
/// - Payments:
///   - POST /api/create-checkout - Create a hosted invoice
///   - POST /api/payments/webhook - NOWPayments IPN handler
///   - POST /webhook - IPN handler (legacy path)
///
/// - Accounts:
///   - POST /api/register - Password registration
///   - POST /api/login - Password login
///   - GET  /auth/google - Start Google OAuth
///   - GET  /auth/google/callback - Finish Google OAuth
///
/// - Affiliate:
///   - GET  /api/affiliate/{code} - Referral signup stats
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - allow all origins for now
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/courses", get(handlers::list_courses))
        .route("/courses/{course_id}", get(handlers::get_course))
        .route("/create-checkout", post(handlers::create_checkout))
        .route("/payments/webhook", post(handlers::payments_webhook))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/affiliate/{code}", get(affiliate::affiliate_stats));

    let oauth_routes = Router::new()
        .route("/google", get(auth::google_login))
        .route("/google/callback", get(auth::google_callback));

    Router::new()
        .route("/health", get(handlers::health))
        // Legacy webhook path, kept for gateways configured before the
        // /api prefix existed
        .route("/webhook", post(handlers::payments_webhook))
        .nest("/api", api_routes)
        .nest("/auth", oauth_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use course_core::{
        Course, CourseCatalog, Invoice, InvoiceGateway, InvoiceRequest, MarketResult, OrderStatus,
    };
    use course_nowpay::{compute_signature, SIGNATURE_HEADER};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Arc;

    const IPN_SECRET: &str = "test-ipn-secret";

    struct FakeGateway;

    #[async_trait]
    impl InvoiceGateway for FakeGateway {
        async fn create_invoice(&self, request: &InvoiceRequest) -> MarketResult<Invoice> {
            Ok(Invoice {
                id: "4522625843".to_string(),
                invoice_url: format!("https://nowpayments.io/payment/?iid={}", request.order_id),
            })
        }

        fn gateway_name(&self) -> &'static str {
            "fake"
        }
    }

    fn test_state() -> AppState {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            domain_url: "http://localhost:3000".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            environment: "test".to_string(),
            google_client_id: None,
            google_client_secret: None,
        };

        let mut catalog = CourseCatalog::new();
        catalog.add(Course::new(
            "crypto-fundamentals",
            "Crypto Fundamentals",
            dec!(90.00),
        ));

        AppState::assemble(config, Arc::new(FakeGateway), IPN_SECRET.to_string(), catalog)
    }

    fn server() -> (TestServer, AppState) {
        let state = test_state();
        let server = TestServer::new(create_router(state.clone())).unwrap();
        (server, state)
    }

    #[tokio::test]
    async fn test_health() {
        let (server, _) = server();
        let response = server.get("/api/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn test_course_catalog_endpoints() {
        let (server, _) = server();

        let list = server.get("/api/courses").await;
        list.assert_status_ok();
        assert_eq!(list.json::<serde_json::Value>()["count"], 1);

        let one = server.get("/api/courses/crypto-fundamentals").await;
        one.assert_status_ok();
        assert_eq!(one.json::<serde_json::Value>()["title"], "Crypto Fundamentals");

        server.get("/api/courses/nope").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_checkout_creates_pending_order() {
        let (server, state) = server();

        let response = server
            .post("/api/create-checkout")
            .json(&json!({
                "price_amount": "90.00",
                "order_id": "ORD-1",
                "order_description": "Crypto Fundamentals",
            }))
            .await;
        response.assert_status_ok();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["order_id"], "ORD-1");
        assert!(body["hosted_url"].as_str().unwrap().contains("nowpayments.io"));

        let order = state.orders.get("ORD-1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_checkout_rejects_bad_amount() {
        let (server, _) = server();

        let response = server
            .post("/api/create-checkout")
            .json(&json!({
                "price_amount": "0",
                "order_id": "ORD-1",
                "order_description": "Crypto Fundamentals",
            }))
            .await;
        response.assert_status_bad_request();
    }

    fn ipn_body(order_id: &str, status: &str) -> String {
        json!({
            "order_id": order_id,
            "payment_status": status,
            "price_amount": 90.00,
            "price_currency": "usd",
        })
        .to_string()
    }

    fn sig_header(body: &str) -> (HeaderName, HeaderValue) {
        let sig = compute_signature(IPN_SECRET, body.as_bytes());
        (
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderValue::from_str(&sig).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_signed_webhook_settles_order() {
        let (server, state) = server();

        server
            .post("/api/create-checkout")
            .json(&json!({
                "price_amount": "90.00",
                "order_id": "ORD-1",
                "order_description": "Crypto Fundamentals",
            }))
            .await
            .assert_status_ok();

        let body = ipn_body("ORD-1", "finished");
        let (name, value) = sig_header(&body);
        let response = server
            .post("/api/payments/webhook")
            .add_header(name, value)
            .bytes(body.into())
            .await;
        response.assert_status_ok();

        let order = state.orders.get("ORD-1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Finished);

        // Redelivery is acknowledged without changing anything
        let body = ipn_body("ORD-1", "finished");
        let (name, value) = sig_header(&body);
        server
            .post("/api/payments/webhook")
            .add_header(name, value)
            .bytes(body.into())
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let (server, _) = server();

        let body = ipn_body("ORD-1", "finished");
        server
            .post("/api/payments/webhook")
            .add_header(
                HeaderName::from_static(SIGNATURE_HEADER),
                HeaderValue::from_str(&"0".repeat(128)).unwrap(),
            )
            .bytes(body.into())
            .await
            .assert_status_bad_request();

        // Missing header is the same rejection
        server
            .post("/api/payments/webhook")
            .bytes(ipn_body("ORD-1", "finished").into())
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_webhook_acks_unknown_order() {
        let (server, state) = server();

        let body = ipn_body("NEVER-ISSUED", "finished");
        let (name, value) = sig_header(&body);
        server
            .post("/webhook")
            .add_header(name, value)
            .bytes(body.into())
            .await
            .assert_status_ok();

        // Acknowledged but never recorded
        assert!(state.orders.get("NEVER-ISSUED").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (server, _) = server();

        server
            .post("/api/register")
            .json(&json!({
                "username": "satoshi",
                "email": "Satoshi@Example.com",
                "password": "longenough",
                "referral": "AFF-42",
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        // Duplicate username is a conflict
        server
            .post("/api/register")
            .json(&json!({
                "username": "satoshi",
                "email": "other@example.com",
                "password": "longenough",
            }))
            .await
            .assert_status(axum::http::StatusCode::CONFLICT);

        // Login by lowercased email
        let login = server
            .post("/api/login")
            .json(&json!({
                "login_id": "satoshi@example.com",
                "password": "longenough",
            }))
            .await;
        login.assert_status_ok();
        let body = login.json::<serde_json::Value>();
        assert_eq!(body["user"]["username"], "satoshi");
        assert!(!body["token"].as_str().unwrap().is_empty());

        // Wrong password is unauthorized
        server
            .post("/api/login")
            .json(&json!({
                "login_id": "satoshi",
                "password": "wrong-password",
            }))
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_affiliate_stats() {
        let (server, _) = server();

        for i in 0..3 {
            server
                .post("/api/register")
                .json(&json!({
                    "username": format!("user-{}", i),
                    "email": format!("user-{}@example.com", i),
                    "password": "longenough",
                    "referral": "AFF-42",
                }))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let response = server.get("/api/affiliate/AFF-42").await;
        response.assert_status_ok();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["referral_code"], "AFF-42");
        assert_eq!(body["signups"], 3);

        let empty = server.get("/api/affiliate/UNUSED").await;
        empty.assert_status_ok();
        assert_eq!(empty.json::<serde_json::Value>()["signups"], 0);
    }

    #[tokio::test]
    async fn test_google_login_unconfigured() {
        let (server, _) = server();
        // No credentials in the test config
        server
            .get("/auth/google")
            .await
            .assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
