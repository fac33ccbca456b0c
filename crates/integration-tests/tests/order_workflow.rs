//! End-to-end order scenarios over the domain model and service doubles:
//! checkout, courier assignment, delivery codes and order events.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use serde_json::{Value, json};

use freshmart_api::realtime::{self, SocketIoRelay};
use freshmart_api::services::TokenService;
use freshmart_api::services::notify::{OrderEventRelay, notify_order_updated};
use freshmart_api::services::sms::send_otp;
use freshmart_core::order::otp::normalize_submission;
use freshmart_core::order::{
    CheckoutRequest, OTP_TTL_MINUTES, OrderError, OrderView, PartySummary, StatusSurface,
};
use freshmart_core::{Email, OrderStatus, PaymentMethod, UserId, UserRole};
use freshmart_integration_tests::{
    RecordingRelay, RecordingSms, pending_order, placed_order, test_config,
};

const CUSTOMER: UserId = UserId::new(10);
const COURIER: UserId = UserId::new(20);
const OTHER_COURIER: UserId = UserId::new(21);

fn checkout_body() -> CheckoutRequest {
    serde_json::from_value(json!({
        "items": [
            { "product": "1", "name": "Fresh Oranges", "price": 4.99, "quantity": 2 },
            { "product": 6, "name": "Fresh Milk", "price": "3.99", "quantity": 1 }
        ],
        "total": 13.97,
        "deliveryPhone": " +15555550100 ",
        "deliveryAddress": "12 Market Road"
    }))
    .unwrap()
}

async fn wait_for_events(relay: &RecordingRelay, count: usize) -> Vec<(String, Value)> {
    for _ in 0..50 {
        let events = relay.events();
        if events.len() >= count {
            return events;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    relay.events()
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_issues_a_code_and_texts_it() {
    let now = Utc::now();
    let order = placed_order(checkout_body(), CUSTOMER, now);

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_method, PaymentMethod::Cod);
    assert!(!order.is_paid);
    assert!(order.order_number.is_well_formed());
    assert_eq!(order.delivery.phone, "+15555550100");
    assert_eq!(order.delivery.name, "Asha Kulkarni");

    let otp = order.otp.clone().unwrap();
    assert_eq!(otp.expires_at - now, Duration::minutes(OTP_TTL_MINUTES));

    let sms = RecordingSms::default();
    assert!(send_otp(&sms, order.id, &order.delivery.phone, &otp.code).await);
    let sent = sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+15555550100");
    assert!(sent[0].1.contains(otp.code.as_str()));
}

#[tokio::test]
async fn test_sms_failure_does_not_fail_checkout() {
    let now = Utc::now();
    let order = placed_order(checkout_body(), CUSTOMER, now);
    let sms = RecordingSms::failing();

    let otp = order.otp.clone().unwrap();
    let sent = send_otp(&sms, order.id, &order.delivery.phone, &otp.code).await;
    assert!(!sent);

    let view = serde_json::to_value(OrderView::new(order).with_otp_sent(sent)).unwrap();
    assert_eq!(view["otpSent"], false);
    assert_eq!(view["status"], "pending");
}

#[test]
fn test_public_order_json_never_leaks_the_code() {
    let now = Utc::now();
    let order = placed_order(checkout_body(), CUSTOMER, now);
    let code = order.otp.clone().unwrap().code;

    let text = serde_json::to_string(&OrderView::new(order)).unwrap();
    assert!(!text.contains(code.as_str()));
    assert!(!text.contains("otpCode"));
    assert!(text.contains("\"otpVerified\":false"));
}

// =============================================================================
// Assignment
// =============================================================================

#[test]
fn test_only_couriers_can_be_assigned() {
    let now = Utc::now();
    let mut order = pending_order(Some(CUSTOMER), now);

    order
        .assign_courier(Some((COURIER, UserRole::Courier)))
        .unwrap();
    assert_eq!(order.courier, Some(COURIER));

    let err = order
        .assign_courier(Some((CUSTOMER, UserRole::Customer)))
        .unwrap_err();
    assert_eq!(err, OrderError::NotACourier);
    assert_eq!(order.courier, Some(COURIER));

    order.assign_courier(None).unwrap();
    assert_eq!(order.courier, None);
}

#[test]
fn test_assignment_view_expands_both_parties() {
    let now = Utc::now();
    let mut order = pending_order(Some(CUSTOMER), now);
    order
        .assign_courier(Some((COURIER, UserRole::Courier)))
        .unwrap();

    let view = OrderView::new(order)
        .with_user(Some(PartySummary {
            id: CUSTOMER,
            name: "Asha Kulkarni".to_owned(),
            email: Email::parse("asha@example.com").unwrap(),
        }))
        .with_courier(Some(PartySummary {
            id: COURIER,
            name: "Rider One".to_owned(),
            email: Email::parse("rider@example.com").unwrap(),
        }));
    let json = serde_json::to_value(view).unwrap();

    assert_eq!(json["user"]["email"], "asha@example.com");
    assert_eq!(json["deliveryBoy"]["name"], "Rider One");
    assert_eq!(json["deliveryBoy"]["_id"], 20);
}

// =============================================================================
// Delivery codes
// =============================================================================

#[test]
fn test_full_delivery_with_code() {
    let now = Utc::now();
    let mut order = pending_order(Some(CUSTOMER), now);
    order
        .assign_courier(Some((COURIER, UserRole::Courier)))
        .unwrap();
    order
        .set_status(OrderStatus::OutForDelivery, StatusSurface::Courier(COURIER))
        .unwrap();

    let code = order.issue_otp(COURIER, now).unwrap();

    let wrong = "000000";
    assert_eq!(
        order.verify_otp(COURIER, wrong, now + Duration::minutes(1)),
        Err(OrderError::OtpMismatch)
    );
    assert_eq!(order.status, OrderStatus::OutForDelivery);

    // Clients may send the code as a JSON number.
    let numeric: u32 = code.as_str().parse().unwrap();
    let submitted = normalize_submission(Some(&json!(numeric))).unwrap();
    order
        .verify_otp(COURIER, &submitted, now + Duration::minutes(2))
        .unwrap();

    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(order.otp_verified);
    assert!(order.otp.is_none());

    assert_eq!(
        order.verify_otp(COURIER, code.as_str(), now + Duration::minutes(3)),
        Err(OrderError::NoOtp)
    );
}

#[test]
fn test_code_expires_at_its_deadline() {
    let now = Utc::now();
    let mut order = pending_order(Some(CUSTOMER), now);
    order
        .assign_courier(Some((COURIER, UserRole::Courier)))
        .unwrap();
    let code = order.issue_otp(COURIER, now).unwrap();
    let deadline = now + Duration::minutes(OTP_TTL_MINUTES);

    assert_eq!(
        order.verify_otp(COURIER, code.as_str(), deadline),
        Err(OrderError::OtpExpired)
    );
    assert!(order.otp.is_some());
    assert_eq!(order.status, OrderStatus::Pending);

    let fresh = order.issue_otp(COURIER, deadline).unwrap();
    order
        .verify_otp(COURIER, fresh.as_str(), deadline + Duration::seconds(30))
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

#[test]
fn test_reissue_replaces_the_previous_code() {
    let now = Utc::now();
    let mut order = pending_order(Some(CUSTOMER), now);
    order
        .assign_courier(Some((COURIER, UserRole::Courier)))
        .unwrap();

    let first = order.issue_otp(COURIER, now).unwrap();
    let mut second = order.issue_otp(COURIER, now).unwrap();
    while second == first {
        second = order.issue_otp(COURIER, now).unwrap();
    }

    assert_eq!(
        order.verify_otp(COURIER, first.as_str(), now),
        Err(OrderError::OtpMismatch)
    );
    order.verify_otp(COURIER, second.as_str(), now).unwrap();
}

#[test]
fn test_courier_boundaries() {
    let now = Utc::now();
    let mut order = pending_order(Some(CUSTOMER), now);

    assert_eq!(order.issue_otp(COURIER, now), Err(OrderError::NotAssigned));

    order
        .assign_courier(Some((COURIER, UserRole::Courier)))
        .unwrap();
    assert_eq!(
        order.issue_otp(OTHER_COURIER, now),
        Err(OrderError::NotAssigned)
    );
    assert_eq!(
        order.set_status(OrderStatus::Delivered, StatusSurface::Courier(COURIER)),
        Err(OrderError::DeliveredRequiresOtp)
    );

    order
        .set_status(OrderStatus::Cancelled, StatusSurface::Admin)
        .unwrap();
    assert_eq!(
        order.set_status(OrderStatus::Processing, StatusSurface::Courier(COURIER)),
        Err(OrderError::AlreadyFinal(OrderStatus::Cancelled))
    );
    assert_eq!(
        order.issue_otp(COURIER, now),
        Err(OrderError::AlreadyFinal(OrderStatus::Cancelled))
    );
}

#[test]
fn test_blank_submissions_are_rejected() {
    assert_eq!(normalize_submission(None), Err(OrderError::OtpRequired));
    assert_eq!(
        normalize_submission(Some(&json!("   "))),
        Err(OrderError::OtpRequired)
    );
    assert_eq!(
        normalize_submission(Some(&json!(["123456"]))),
        Err(OrderError::OtpRequired)
    );
}

// =============================================================================
// Order events
// =============================================================================

#[tokio::test]
async fn test_changes_reach_the_purchaser_room() {
    let relay = RecordingRelay::default();
    let mut order = pending_order(Some(CUSTOMER), Utc::now());
    order
        .set_status(OrderStatus::Processing, StatusSurface::Admin)
        .unwrap();

    notify_order_updated(Arc::new(relay.clone()), OrderView::new(order));

    let events = wait_for_events(&relay, 1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, CUSTOMER.room());
    assert_eq!(events[0].1["status"], "processing");
    assert_eq!(events[0].1["user"], 10);
}

#[tokio::test]
async fn test_orders_without_purchaser_emit_nothing() {
    let relay = RecordingRelay::default();
    let order = pending_order(None, Utc::now());

    notify_order_updated(Arc::new(relay.clone()), OrderView::new(order));

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert!(relay.events().is_empty());
}

#[tokio::test]
async fn test_socket_layer_relays_to_rooms() {
    let (_layer, io) = realtime::layer(TokenService::new(&test_config().jwt));
    let relay = SocketIoRelay::new(io);
    let order = pending_order(Some(CUSTOMER), Utc::now());

    relay
        .order_updated(&CUSTOMER.room(), &OrderView::new(order))
        .await
        .unwrap();
}
