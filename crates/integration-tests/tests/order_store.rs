//! Order scenarios against a real `PostgreSQL` store, driven through the
//! router with signed tokens.
//!
//! These tests require:
//! - A scratch `PostgreSQL` database in `FRESHMART_TEST_DATABASE_URL`
//!   (migrations are applied on connect)
//!
//! Run with: cargo test -p freshmart-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use freshmart_api::db::OrderRepository;
use freshmart_api::models::User;
use freshmart_api::services::AuthService;
use freshmart_api::state::AppState;
use freshmart_core::{OrderId, UserRole};
use freshmart_integration_tests::{RecordingRelay, RecordingSms, send, test_config, token_for};

struct Store {
    pool: PgPool,
    sms: RecordingSms,
    app: Router,
}

impl Store {
    async fn open() -> Self {
        let url = std::env::var("FRESHMART_TEST_DATABASE_URL")
            .expect("FRESHMART_TEST_DATABASE_URL must name a scratch database");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("../api/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let sms = RecordingSms::default();
        let state = AppState::new(
            test_config(),
            pool.clone(),
            Arc::new(sms.clone()),
            Arc::new(RecordingRelay::default()),
        );
        Self {
            pool,
            sms,
            app: freshmart_api::app(state),
        }
    }

    async fn user(&self, role: UserRole) -> (User, String) {
        let email = format!("{role}-{}@example.com", Uuid::new_v4().simple());
        let user = AuthService::new(&self.pool)
            .create_user("Store Test", &email, "correct-horse-battery", role)
            .await
            .unwrap();
        let token = token_for(user.id, role);
        (user, token)
    }

    async fn call(&self, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("x-forwarded-for", "198.51.100.30");
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let (response, json) = send(self.app.clone(), request).await;
        (response.status(), json)
    }

    async fn checkout(&self, token: &str) -> i64 {
        let (status, order) = self
            .call(
                "POST",
                "/api/orders",
                token,
                Some(json!({
                    "items": [{ "product": 1, "name": "Fresh Oranges", "price": 4.99, "quantity": 2 }],
                    "total": 9.98,
                    "deliveryPhone": "+15555550100",
                    "deliveryAddress": "12 Market Road"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        order["_id"].as_i64().unwrap()
    }

    /// Delivery code carried by the most recent text message.
    fn last_code(&self) -> String {
        let sent = self.sms.sent();
        let (_, body) = sent.last().expect("no text message sent");
        body.split(|c: char| !c.is_ascii_digit())
            .find(|part| part.len() == 6)
            .expect("text message carries no code")
            .to_owned()
    }

    async fn pending_code_columns(&self, id: i64) -> (Option<String>, bool) {
        let (code, has_expiry): (Option<String>, bool) = sqlx::query_as(
            "SELECT otp_code, otp_expires IS NOT NULL FROM orders WHERE id = $1",
        )
        .bind(i32::try_from(id).unwrap())
        .fetch_one(&self.pool)
        .await
        .unwrap();
        (code, has_expiry)
    }
}

// =============================================================================
// Delivery codes
// =============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_courier_confirms_delivery_with_texted_code() {
    let store = Store::open().await;
    let (_, customer) = store.user(UserRole::Customer).await;
    let (courier, courier_token) = store.user(UserRole::Courier).await;
    let (_, admin) = store.user(UserRole::Admin).await;

    let id = store.checkout(&customer).await;
    let checkout_code = store.last_code();

    let (status, order) = store
        .call(
            "PUT",
            &format!("/api/orders/{id}/assign"),
            &admin,
            Some(json!({ "deliveryBoyId": courier.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["deliveryBoy"]["_id"], json!(courier.id));

    let (status, issued) = store
        .call("POST", &format!("/api/orders/delivery/{id}/generate-otp"), &courier_token, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{issued}");
    assert_eq!(issued["otpSent"], true);
    let code = store.last_code();

    let verify = format!("/api/orders/delivery/{id}/verify-otp");
    if checkout_code != code {
        let (status, body) = store
            .call("POST", &verify, &courier_token, Some(json!({ "otp": checkout_code })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid OTP");
    }

    let (status, body) = store.call("POST", &verify, &courier_token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "OTP is required");

    let (status, body) = store
        .call("POST", &verify, &courier_token, Some(json!({ "otp": code })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["order"]["status"], "delivered");
    assert_eq!(body["order"]["otpVerified"], true);
    assert_eq!(store.pending_code_columns(id).await, (None, false));

    let (status, body) = store
        .call("POST", &verify, &courier_token, Some(json!({ "otp": code })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No OTP generated for this order");
}

// =============================================================================
// Assignment
// =============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_non_courier_assignment_keeps_current_courier() {
    let store = Store::open().await;
    let (customer, customer_token) = store.user(UserRole::Customer).await;
    let (courier, _) = store.user(UserRole::Courier).await;
    let (_, admin) = store.user(UserRole::Admin).await;

    let id = store.checkout(&customer_token).await;
    let assign = format!("/api/orders/{id}/assign");

    let (status, _) = store
        .call("PUT", &assign, &admin, Some(json!({ "deliveryBoyId": courier.id })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = store
        .call("PUT", &assign, &admin, Some(json!({ "deliveryBoyId": customer.id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User is not a delivery user");

    let (status, body) = store
        .call("PUT", &assign, &admin, Some(json!({ "deliveryBoyId": i32::MAX })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Delivery user not found");

    let stored = OrderRepository::new(&store.pool)
        .get(OrderId::new(i32::try_from(id).unwrap()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.order.courier, Some(courier.id));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_missing_order_is_reported_before_courier() {
    let store = Store::open().await;
    let (_, customer) = store.user(UserRole::Customer).await;
    let (_, admin) = store.user(UserRole::Admin).await;
    let id = store.checkout(&customer).await;

    let (status, body) = store
        .call(
            "PUT",
            &format!("/api/orders/{}/assign", i32::MAX),
            &admin,
            Some(json!({ "deliveryBoyId": "not-a-user" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Order not found");

    let (status, body) = store
        .call(
            "PUT",
            &format!("/api/orders/{id}/assign"),
            &admin,
            Some(json!({ "deliveryBoyId": "not-a-user" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Delivery user not found");
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn test_purchaser_sees_only_their_orders() {
    let store = Store::open().await;
    let (_, first) = store.user(UserRole::Customer).await;
    let (_, second) = store.user(UserRole::Customer).await;

    let id = store.checkout(&first).await;

    let (status, mine) = store.call("GET", "/api/orders/my-orders", &first, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["_id"], json!(id));
    assert!(mine[0].get("otpCode").is_none());

    let (status, theirs) = store.call("GET", "/api/orders/my-orders", &second, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(theirs.as_array().unwrap().is_empty());
}
