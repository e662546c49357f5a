//! Tests for the POST /purchase endpoint.

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::*;

fn purchase_body(email: &str, plan_id: i64) -> serde_json::Value {
    json!({
        "full_name": "Test User",
        "email": email,
        "mobile_number": "9876543210",
        "plan_id": plan_id,
    })
}

#[tokio::test]
async fn free_plan_activates_immediately() {
    let env = test_env();

    let (status, body) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("free@example.com", 0),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["plan"], "Free Trial Plan 0");
    assert!(body.get("order_ref").is_none());

    // No gateway involvement, one delivered key
    assert_eq!(env.gateway.order_count(), 0);
    assert_eq!(env.notifier.delivery_count(), 1);
    let delivered = env.notifier.last_body_for("free@example.com").unwrap();
    let key = key_from_body(&delivered);
    assert_eq!(key.len(), 12);
    assert!(key.chars().all(|c| c.is_ascii_digit()));

    let record = record_for(&env.pool, "free@example.com");
    assert_eq!(record.status, LicenseStatus::Active);
    assert!(record.pending_plaintext_credential.is_none());
    assert_eq!(
        record.expires_at.unwrap() - record.issued_at.unwrap(),
        7 * 86_400
    );
}

#[tokio::test]
async fn paid_plan_reserves_pending_payment() {
    let env = test_env();

    let (status, body) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("paid@example.com", 1),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING_PAYMENT");
    assert_eq!(body["amount_minor_units"], 50_000);
    assert!(body["order_ref"].as_str().is_some());

    // Key is reserved but not delivered until payment completes
    assert_eq!(env.notifier.delivery_count(), 0);
    assert_eq!(env.gateway.order_count(), 1);

    let record = record_for(&env.pool, "paid@example.com");
    assert_eq!(record.status, LicenseStatus::PendingPayment);
    assert!(record.pending_plaintext_credential.is_some());
    assert!(record.payment_order_ref.is_some());
    assert!(record.issued_at.is_none());
    assert!(record.expires_at.is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected_with_conflict() {
    let env = test_env();

    let (first, _) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("dup@example.com", 0),
    )
    .await;
    assert_eq!(first, StatusCode::OK);

    // Same email again, different plan - still a conflict
    let (second, body) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("dup@example.com", 1),
    )
    .await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    // Exactly one record survives
    let conn = env.pool.get().unwrap();
    assert_eq!(
        queries::count_licenses_by_email(&conn, "dup@example.com").unwrap(),
        1
    );
}

#[tokio::test]
async fn email_lookup_is_case_insensitive() {
    let env = test_env();

    let (first, _) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("Case@Example.com", 0),
    )
    .await;
    assert_eq!(first, StatusCode::OK);

    let (second, _) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("case@example.COM", 0),
    )
    .await;
    assert_eq!(second, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_plan_is_a_bad_request() {
    let env = test_env();

    let (status, body) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("who@example.com", 9),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("9"));

    // Nothing persisted for a rejected plan
    let conn = env.pool.get().unwrap();
    assert!(
        queries::get_license_by_email(&conn, "who@example.com")
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn malformed_input_returns_field_errors() {
    let env = test_env();

    let (status, body) = post_json(
        test_app(&env),
        "/purchase",
        json!({
            "full_name": "  ",
            "email": "not-an-email",
            "mobile_number": "12345",
            "plan_id": 0,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["full_name", "email", "mobile_number"]);
}

#[tokio::test]
async fn free_plan_delivery_failure_does_not_roll_back() {
    let env = test_env();
    env.notifier.set_fail(true);

    let (status, body) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("nofanfare@example.com", 0),
    )
    .await;

    // Persistence is the source of truth; notification is advisory
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACTIVE");

    let record = record_for(&env.pool, "nofanfare@example.com");
    assert_eq!(record.status, LicenseStatus::Active);
}

#[tokio::test]
async fn gateway_failure_leaves_recoverable_reservation() {
    let env = test_env();
    env.gateway.set_fail_orders(true);

    let (status, _) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("stranded@example.com", 2),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // The reservation survives, without an order, awaiting retry
    let record = record_for(&env.pool, "stranded@example.com");
    assert_eq!(record.status, LicenseStatus::PendingPayment);
    assert!(record.payment_order_ref.is_none());

    env.gateway.set_fail_orders(false);
    let (status, body) = post_json(
        test_app(&env),
        "/purchase/retry-order",
        json!({ "account_id": record.id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["order_ref"].as_str().is_some());
    assert_eq!(body["amount_minor_units"], 100_000);

    let record = record_for(&env.pool, "stranded@example.com");
    assert!(record.payment_order_ref.is_some());
}

#[tokio::test]
async fn retry_order_rejects_records_that_already_have_one() {
    let env = test_env();

    let (_, body) = post_json(
        test_app(&env),
        "/purchase",
        purchase_body("ordered@example.com", 1),
    )
    .await;
    let account_id = body["account_id"].as_str().unwrap().to_string();

    let (status, _) = post_json(
        test_app(&env),
        "/purchase/retry-order",
        json!({ "account_id": account_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
